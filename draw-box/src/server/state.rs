//! Application state for the draw box HTTP server.

use crate::service::DrawBoxService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Draw box operations
    pub service: Arc<DrawBoxService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: DrawBoxService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
