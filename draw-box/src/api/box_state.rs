//! Box state query endpoint.
//!
//! - GET /api/box - Current box, rotated or healed on the way if needed

use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use draw_box_core::BoxView;
use draw_box_web::{AppError, CorrelationId};

/// Get the current box.
///
/// Public endpoint. The response is never cacheable: every draw changes it.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/box
/// ```
///
/// Response:
/// ```json
/// {
///   "box_id": "550e8400-e29b-41d4-a716-446655440000",
///   "tickets": [
///     {"position": 0, "rank": null, "taken": false},
///     {"position": 1, "rank": "B", "taken": true}
///   ],
///   "prize_info": [
///     {"rank": "A", "remaining": 1, "total_quantity": 1},
///     {"rank": "B", "remaining": 0, "total_quantity": 1}
///   ]
/// }
/// ```
///
/// # Errors
///
/// - 503 `STORAGE_UNAVAILABLE` once read retries are exhausted
pub async fn get_box_state(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
) -> Result<impl IntoResponse, AppError> {
    let view: BoxView = state.service.get_box_state().await?;
    tracing::debug!(
        correlation_id = %correlation_id,
        box_id = %view.box_id,
        remaining = view.remaining(),
        "Box state served"
    );
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(view)))
}
