//! Router configuration for the draw box.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{admin, box_state, draws};
use axum::{
    Router,
    routing::{get, post},
};
use draw_box_web::correlation_id_layer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `GET /health`, `GET /ready`
/// - `GET /api/box`
/// - `POST /api/box/:box_id/draws`
/// - `POST /api/admin/box/reset`
///
/// Every request gets a correlation id and a tracing span.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/box", get(box_state::get_box_state))
        .route("/box/:box_id/draws", post(draws::draw_tickets))
        .route("/admin/box/reset", post(admin::reset_box));

    Router::new()
        // Health checks (no caller identity)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
