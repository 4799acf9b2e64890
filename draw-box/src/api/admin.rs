//! Administrative endpoints.
//!
//! - POST /api/admin/box/reset - Retire the active box and start a new one

use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use draw_box_core::{BoxId, PrizeDistribution, TierRequest};
use draw_box_web::{AdminClaimant, AppError, AppJson};
use serde::{Deserialize, Serialize};

/// Request to reset the box.
#[derive(Debug, Deserialize)]
pub struct ResetBoxRequest {
    /// Tiers of the new box, best prizes first
    pub prize_distribution: Vec<TierRequest>,
}

/// Response for a reset.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetBoxResponse {
    /// The newly active box
    pub box_id: BoxId,
}

/// Reset the box with a new prize distribution.
///
/// Requires `X-Claimant-Roles` to include `admin`. The old box stays stored
/// as history with its claims intact.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/admin/box/reset \
///   -H "X-Claimant-Id: ops-1" -H "X-Claimant-Roles: admin" \
///   -H "Content-Type: application/json" \
///   -d '{"prize_distribution": [{"rank": "A", "total_quantity": 1}, {"rank": "B", "total_quantity": 4}]}'
/// ```
///
/// # Errors
///
/// - 401 / 403: caller missing or not an administrator
/// - 422 `INVALID_DISTRIBUTION`: nothing was changed
/// - 503 `STORAGE_UNAVAILABLE`
pub async fn reset_box(
    State(state): State<AppState>,
    AdminClaimant(admin): AdminClaimant,
    AppJson(request): AppJson<ResetBoxRequest>,
) -> Result<(StatusCode, Json<ResetBoxResponse>), AppError> {
    let distribution = PrizeDistribution::new(request.prize_distribution)?;
    let box_id = state.service.reset_box(&distribution).await?;
    tracing::info!(admin = %admin, box_id = %box_id, distribution = %distribution, "Box reset");
    Ok((StatusCode::CREATED, Json(ResetBoxResponse { box_id })))
}
