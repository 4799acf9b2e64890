//! Draw endpoint.
//!
//! - POST /api/box/:box_id/draws - Claim a batch of tickets, all or nothing

use crate::coordinator::DrawResult;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use draw_box_core::{BoxId, Rank};
use draw_box_web::{AppError, AppJson, AppPath, Claimant};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to draw tickets.
#[derive(Debug, Deserialize)]
pub struct DrawTicketsRequest {
    /// Positions to claim; duplicates collapse
    pub positions: Vec<u32>,
}

/// One claimed ticket, rank disclosed.
#[derive(Debug, Serialize, Deserialize)]
pub struct DrawnTicket {
    /// Ticket position
    pub position: u32,
    /// Rank won
    pub rank: Rank,
    /// Always `true`
    pub taken: bool,
}

/// Response for a committed draw.
#[derive(Debug, Serialize, Deserialize)]
pub struct DrawTicketsResponse {
    /// Box the tickets belong to
    pub box_id: BoxId,
    /// Claimed tickets in ascending position order
    pub tickets: Vec<DrawnTicket>,
}

impl From<DrawResult> for DrawTicketsResponse {
    fn from(result: DrawResult) -> Self {
        Self {
            box_id: result.box_id,
            tickets: result
                .tickets
                .into_iter()
                .map(|t| DrawnTicket {
                    position: t.position,
                    rank: t.rank,
                    taken: true,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Draw tickets from a box.
///
/// Requires the `X-Claimant-Id` header set by the auth gateway.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/box/550e8400-e29b-41d4-a716-446655440000/draws \
///   -H "X-Claimant-Id: player-42" \
///   -H "Content-Type: application/json" \
///   -d '{"positions": [0, 3]}'
/// ```
///
/// # Errors
///
/// - 400 `INVALID_REQUEST`: empty, oversized or out-of-range positions, a
///   malformed box id or body
/// - 401: no caller identity
/// - 404 `BOX_NOT_FOUND`
/// - 409 `BOX_INACTIVE`: the box was rotated; read the state again
/// - 409 `ALREADY_TAKEN`: nothing was claimed; `positions` lists the conflicts
/// - 503 `STORAGE_UNAVAILABLE`
pub async fn draw_tickets(
    State(state): State<AppState>,
    Claimant(claimant): Claimant,
    AppPath(box_id): AppPath<Uuid>,
    AppJson(request): AppJson<DrawTicketsRequest>,
) -> Result<Json<DrawTicketsResponse>, AppError> {
    let result = state
        .service
        .draw_tickets(BoxId::from_uuid(box_id), request.positions, &claimant)
        .await?;
    Ok(Json(result.into()))
}
