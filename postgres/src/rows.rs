//! Row decoding helpers.

use draw_box_core::{
    BoxId, BoxStatus, BoxSummary, ClaimantId, DrawBoxError, PrizeDistribution, Rank, Result,
    Ticket,
};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

pub(crate) const BOX_COLUMNS: &str = "id, status, prize_distribution, ticket_count, created_at";

pub(crate) fn storage(context: &str) -> impl FnOnce(sqlx::Error) -> DrawBoxError + '_ {
    move |e| {
        tracing::error!(error = %e, "{context}");
        DrawBoxError::StorageUnavailable(format!("{context}: {e}"))
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> DrawBoxError {
    tracing::error!(%detail, "Corrupt {what} row");
    DrawBoxError::StorageUnavailable(format!("Corrupt {what} row: {detail}"))
}

pub(crate) fn to_db_position(position: u32) -> Result<i32> {
    i32::try_from(position)
        .map_err(|_| DrawBoxError::InvalidRequest(format!("Position {position} out of range")))
}

pub(crate) fn from_db_position(position: i32) -> Result<u32> {
    u32::try_from(position).map_err(|e| corrupt("ticket", e))
}

pub(crate) fn box_summary(row: &PgRow) -> Result<BoxSummary> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("box", e))?;
    let status: String = row.try_get("status").map_err(|e| corrupt("box", e))?;
    let Json(distribution): Json<PrizeDistribution> = row
        .try_get("prize_distribution")
        .map_err(|e| corrupt("box", e))?;
    let ticket_count: i32 = row.try_get("ticket_count").map_err(|e| corrupt("box", e))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| corrupt("box", e))?;

    Ok(BoxSummary {
        id: BoxId::from_uuid(id),
        status: status.parse::<BoxStatus>().map_err(|e| corrupt("box", e))?,
        distribution,
        ticket_count: u32::try_from(ticket_count).map_err(|e| corrupt("box", e))?,
        created_at,
    })
}

pub(crate) fn ticket(row: &PgRow) -> Result<Ticket> {
    let position: i32 = row.try_get("position").map_err(|e| corrupt("ticket", e))?;
    let rank: String = row.try_get("rank").map_err(|e| corrupt("ticket", e))?;
    let taken: bool = row.try_get("taken").map_err(|e| corrupt("ticket", e))?;
    let claimed_by: Option<String> = row.try_get("claimed_by").map_err(|e| corrupt("ticket", e))?;
    let claimed_at: Option<DateTime<Utc>> =
        row.try_get("claimed_at").map_err(|e| corrupt("ticket", e))?;

    Ok(Ticket {
        position: from_db_position(position)?,
        rank: Rank::new(rank).map_err(|e| corrupt("ticket", e))?,
        taken,
        claimed_by: claimed_by
            .map(ClaimantId::new)
            .transpose()
            .map_err(|e| corrupt("ticket", e))?,
        claimed_at,
    })
}
