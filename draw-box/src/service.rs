//! `DrawBoxService`: the facade the HTTP layer talks to.
//!
//! Wires the lifecycle manager, the draw coordinator and the projector
//! together over one shared [`BoxStore`].

use crate::config::DrawConfig;
use crate::coordinator::{DrawCoordinator, DrawResult};
use crate::lifecycle::BoxLifecycleManager;
use crate::metrics;
use crate::retry::{RetryPolicy, retry_transient};
use draw_box_core::environment::Clock;
use draw_box_core::ledger::PrizeLedger;
use draw_box_core::store::BoxStore;
use draw_box_core::{
    BoxId, BoxView, ClaimantId, PrizeDistribution, Result, TicketBox, project_box_view,
};
use std::sync::Arc;
use std::time::Duration;

/// Draw box operations exposed to callers.
#[derive(Clone)]
pub struct DrawBoxService {
    store: Arc<dyn BoxStore>,
    lifecycle: BoxLifecycleManager,
    coordinator: DrawCoordinator,
    read_retry: RetryPolicy,
}

impl DrawBoxService {
    /// Build the service over a store, a ledger and a clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn BoxStore>,
        ledger: Arc<dyn PrizeLedger>,
        clock: Arc<dyn Clock>,
        config: &DrawConfig,
    ) -> Self {
        let lifecycle = BoxLifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.default_distribution.clone(),
        );
        let coordinator = DrawCoordinator::new(
            Arc::clone(&store),
            ledger,
            clock,
            config.max_positions_per_draw,
        );
        let read_retry = RetryPolicy::builder()
            .max_retries(config.retry_max)
            .initial_delay(Duration::from_millis(config.retry_initial_ms))
            .build();

        Self {
            store,
            lifecycle,
            coordinator,
            read_retry,
        }
    }

    /// Replace the retry policy used for reads.
    #[must_use]
    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    /// Current box as callers see it: ranks of undrawn tickets hidden,
    /// remaining counts per rank.
    ///
    /// Rotation and self-healing happen here transparently. Transient storage
    /// failures are retried; every lifecycle step is idempotent.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: retries exhausted
    #[tracing::instrument(skip(self))]
    pub async fn get_box_state(&self) -> Result<BoxView> {
        let ticket_box = self.active_box().await?;
        let view = project_box_view(&ticket_box);
        metrics::set_tickets_remaining(view.remaining());
        Ok(view)
    }

    /// Current active box with full ticket detail, ranks included.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: retries exhausted
    pub async fn active_box(&self) -> Result<TicketBox> {
        retry_transient(&self.read_retry, || self.lifecycle.get_or_rotate_active_box()).await
    }

    /// Claim `positions` in `box_id` for `claimant`, all or nothing.
    ///
    /// Never retried here: if the outcome of a commit is unknown, the caller
    /// resolves it by reading the box state.
    ///
    /// # Errors
    ///
    /// See [`DrawCoordinator::draw_tickets`].
    pub async fn draw_tickets(
        &self,
        box_id: BoxId,
        positions: impl IntoIterator<Item = u32>,
        claimant: &ClaimantId,
    ) -> Result<DrawResult> {
        self.coordinator.draw_tickets(box_id, positions, claimant).await
    }

    /// Retire every active box and start a new one from `distribution`.
    ///
    /// Authorization is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the reset may have retired the old box without
    ///   creating the new one; the next read then creates a default box
    pub async fn reset_box(&self, distribution: &PrizeDistribution) -> Result<BoxId> {
        let ticket_box = self.lifecycle.reset_box(distribution).await?;
        Ok(ticket_box.id())
    }

    /// Whether the store answers.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the store is unreachable
    pub async fn ready(&self) -> Result<()> {
        self.store.ping().await
    }
}
