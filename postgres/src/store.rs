//! `PostgresBoxStore`: the production `BoxStore`.

use crate::PostgresConfig;
use crate::rows::{self, BOX_COLUMNS, storage};
use chrono::{DateTime, Utc};
use draw_box_core::store::{BoxStore, StoreFuture};
use draw_box_core::{
    BoxId, BoxStatus, BoxSummary, ClaimOutcome, ClaimantId, ClaimedTicket, DrawBoxError,
    DrawRequest, NewBox, Rank, Result, TicketBox,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// `PostgreSQL`-backed box store.
///
/// Every trait method runs as its own statement or transaction; no state is
/// cached in the process, so any number of service instances may share one
/// database.
#[derive(Clone, Debug)]
pub struct PostgresBoxStore {
    pool: PgPool,
}

impl PostgresBoxStore {
    /// Build a pool from `config` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the URL is invalid or the database
    /// cannot be reached.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(storage("Invalid database URL"))?
            .options([(
                "statement_timeout",
                format!("{}ms", config.statement_timeout.as_millis()),
            )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(options)
            .await
            .map_err(storage("Failed to connect to database"))?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database pool created"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run embedded database migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DrawBoxError::StorageUnavailable(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn fetch_active(&self) -> Result<Vec<BoxSummary>> {
        let query = format!(
            "SELECT {BOX_COLUMNS} FROM lottery_boxes
             WHERE status = 'active'
             ORDER BY created_at DESC, seq DESC"
        );
        let records = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list active boxes"))?;
        records.iter().map(rows::box_summary).collect()
    }

    async fn fetch_box(&self, box_id: BoxId) -> Result<Option<TicketBox>> {
        let query = format!("SELECT {BOX_COLUMNS} FROM lottery_boxes WHERE id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(box_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to load box"))?
        else {
            return Ok(None);
        };
        let summary = rows::box_summary(&row)?;

        let tickets = sqlx::query(
            "SELECT position, rank, taken, claimed_by, claimed_at
             FROM lottery_tickets
             WHERE box_id = $1
             ORDER BY position",
        )
        .bind(box_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load tickets"))?
        .iter()
        .map(rows::ticket)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(TicketBox { summary, tickets }))
    }

    async fn persist_box(&self, new_box: NewBox) -> Result<BoxSummary> {
        let summary = new_box.summary();
        let ticket_count = i32::try_from(summary.ticket_count).map_err(|_| {
            DrawBoxError::InvalidDistribution("Ticket count out of range".to_string())
        })?;
        let positions = new_box
            .slots()
            .iter()
            .map(|slot| rows::to_db_position(slot.position))
            .collect::<Result<Vec<i32>>>()?;
        let ranks: Vec<String> = new_box
            .slots()
            .iter()
            .map(|slot| slot.rank.as_str().to_string())
            .collect();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin transaction"))?;

        sqlx::query(
            "INSERT INTO lottery_boxes (id, status, prize_distribution, ticket_count, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(summary.id.as_uuid())
        .bind(BoxStatus::Active.as_str())
        .bind(Json(&summary.distribution))
        .bind(ticket_count)
        .bind(summary.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage("Failed to insert box"))?;

        sqlx::query(
            "INSERT INTO lottery_tickets (box_id, position, rank)
             SELECT $1, t.position, t.rank
             FROM UNNEST($2::INTEGER[], $3::TEXT[]) AS t(position, rank)",
        )
        .bind(summary.id.as_uuid())
        .bind(&positions)
        .bind(&ranks)
        .execute(&mut *tx)
        .await
        .map_err(storage("Failed to insert tickets"))?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit box insertion"))?;

        tracing::debug!(box_id = %summary.id, tickets = summary.ticket_count, "Box persisted");
        Ok(summary)
    }

    async fn flip_inactive(&self, box_id: BoxId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE lottery_boxes SET status = 'inactive'
             WHERE id = $1 AND status = 'active'",
        )
        .bind(box_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to deactivate box"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn flip_all_inactive(&self) -> Result<Vec<BoxId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE lottery_boxes SET status = 'inactive'
             WHERE status = 'active'
             RETURNING id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to deactivate active boxes"))?;
        Ok(ids.into_iter().map(BoxId::from_uuid).collect())
    }

    async fn claim(
        &self,
        box_id: BoxId,
        request: &DrawRequest,
        claimant: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let positions = request
            .positions()
            .map(rows::to_db_position)
            .collect::<Result<Vec<i32>>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin transaction"))?;

        // Shares the box row with other claims but conflicts with the status
        // update of a rotation or reset.
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM lottery_boxes WHERE id = $1 FOR SHARE")
                .bind(box_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("Failed to lock box"))?;

        match status.as_deref() {
            None => {
                roll_back(tx, box_id).await;
                return Err(DrawBoxError::BoxNotFound(box_id));
            }
            Some(s) if s != BoxStatus::Active.as_str() => {
                roll_back(tx, box_id).await;
                return Err(DrawBoxError::BoxInactive(box_id));
            }
            Some(_) => {}
        }

        let updated = sqlx::query(
            "UPDATE lottery_tickets
             SET taken = TRUE, claimed_by = $3, claimed_at = $4
             WHERE box_id = $1 AND position = ANY($2) AND taken = FALSE
             RETURNING position, rank",
        )
        .bind(box_id.as_uuid())
        .bind(&positions)
        .bind(claimant.as_str())
        .bind(claimed_at)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage("Failed to claim tickets"))?;

        let mut claimed = Vec::with_capacity(updated.len());
        for row in &updated {
            let position: i32 = row
                .try_get("position")
                .map_err(storage("Failed to decode claimed ticket"))?;
            let rank: String = row
                .try_get("rank")
                .map_err(storage("Failed to decode claimed ticket"))?;
            claimed.push(ClaimedTicket {
                position: rows::from_db_position(position)?,
                rank: Rank::new(rank)?,
            });
        }

        if claimed.len() != request.len() {
            roll_back(tx, box_id).await;
            let flipped: BTreeSet<u32> = claimed.iter().map(|t| t.position).collect();
            let not_free = request.positions().filter(|p| !flipped.contains(p)).collect();
            return Ok(ClaimOutcome::Rejected(not_free));
        }

        tx.commit()
            .await
            .map_err(storage("Failed to commit claim"))?;

        claimed.sort_by_key(|t| t.position);
        Ok(ClaimOutcome::Committed(claimed))
    }
}

/// Roll back a claim that must not commit, logging a failed rollback.
async fn roll_back(tx: Transaction<'_, Postgres>, box_id: BoxId) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(box_id = %box_id, error = %e, "Failed to roll back claim");
    }
}

impl BoxStore for PostgresBoxStore {
    fn active_boxes(&self) -> StoreFuture<'_, Vec<BoxSummary>> {
        Box::pin(self.fetch_active())
    }

    fn load_box(&self, box_id: BoxId) -> StoreFuture<'_, Option<TicketBox>> {
        Box::pin(self.fetch_box(box_id))
    }

    fn insert_box(&self, new_box: NewBox) -> StoreFuture<'_, BoxSummary> {
        Box::pin(self.persist_box(new_box))
    }

    fn deactivate_box(&self, box_id: BoxId) -> StoreFuture<'_, bool> {
        Box::pin(self.flip_inactive(box_id))
    }

    fn deactivate_all_active(&self) -> StoreFuture<'_, Vec<BoxId>> {
        Box::pin(self.flip_all_inactive())
    }

    fn claim_tickets<'a>(
        &'a self,
        box_id: BoxId,
        request: &'a DrawRequest,
        claimant: &'a ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> StoreFuture<'a, ClaimOutcome> {
        Box::pin(self.claim(box_id, request, claimant, claimed_at))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(storage("Database ping failed"))?;
            Ok(())
        })
    }
}
