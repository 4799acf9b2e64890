//! Error types for web handlers.
//!
//! [`AppError`] bridges [`DrawBoxError`] and HTTP responses. Every error body
//! is `{"code": ..., "message": ...}`; `ALREADY_TAKEN` adds the list of
//! positions that were not free.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use draw_box_core::DrawBoxError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```
/// use draw_box_web::AppError;
/// use draw_box_core::{BoxId, DrawBoxError};
///
/// let err: AppError = DrawBoxError::BoxNotFound(BoxId::new()).into();
/// assert_eq!(err.status().as_u16(), 404);
/// assert_eq!(err.code(), "BOX_NOT_FOUND");
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    positions: Option<Vec<u32>>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            positions: None,
            source: None,
        }
    }

    /// Attach an internal source error, logged for 5xx responses.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED".to_string())
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN".to_string())
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Positions reported with an `ALREADY_TAKEN` error.
    #[must_use]
    pub fn positions(&self) -> Option<&[u32]> {
        self.positions.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<DrawBoxError> for AppError {
    fn from(err: DrawBoxError) -> Self {
        let status = match &err {
            DrawBoxError::InvalidDistribution(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DrawBoxError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DrawBoxError::BoxNotFound(_) => StatusCode::NOT_FOUND,
            DrawBoxError::BoxInactive(_) | DrawBoxError::AlreadyTaken { .. } => {
                StatusCode::CONFLICT
            }
            DrawBoxError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let positions = match &err {
            DrawBoxError::AlreadyTaken { positions, .. } => Some(positions.clone()),
            _ => None,
        };
        // Storage details stay in the logs.
        let message = if err.is_retryable() {
            "Storage temporarily unavailable, retry the request".to_string()
        } else {
            err.to_string()
        };
        let code = err.code().to_string();
        let mut app_error = Self::new(status, message, code);
        app_error.positions = positions;
        if status.is_server_error() {
            app_error = app_error.with_source(anyhow::Error::new(err));
        }
        app_error
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<u32>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            positions: self.positions,
        };

        (self.status, Json(body)).into_response()
    }
}

/// A malformed JSON body keeps axum's status (400, 415 or 422).
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            rejection.body_text(),
            "INVALID_REQUEST".to_string(),
        )
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            rejection.status(),
            rejection.body_text(),
            "INVALID_REQUEST".to_string(),
        )
    }
}
