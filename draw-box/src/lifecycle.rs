//! Box Lifecycle Manager.
//!
//! Owns box creation, exhaustion rotation and self-healing of duplicate
//! active boxes. Every step goes through the [`BoxStore`]; concurrent
//! managers converge on a single active box because deactivation is
//! idempotent and every read collapses duplicates down to the newest box.

use crate::metrics::{self, RotationReason};
use draw_box_core::environment::Clock;
use draw_box_core::store::BoxStore;
use draw_box_core::{
    BoxSummary, DrawBoxError, PrizeDistribution, Result, ShuffleGenerator, Ticket, TicketBox,
};
use std::sync::Arc;

/// Number of passes before the manager stops chasing concurrent rotations.
const MAX_PASSES: usize = 3;

/// Creates, rotates and heals boxes.
#[derive(Clone)]
pub struct BoxLifecycleManager {
    store: Arc<dyn BoxStore>,
    clock: Arc<dyn Clock>,
    shuffle: ShuffleGenerator,
    default_distribution: PrizeDistribution,
}

impl BoxLifecycleManager {
    /// Create a manager.
    ///
    /// `default_distribution` is used whenever a box has to be created
    /// because none is active.
    #[must_use]
    pub fn new(
        store: Arc<dyn BoxStore>,
        clock: Arc<dyn Clock>,
        default_distribution: PrizeDistribution,
    ) -> Self {
        Self {
            store,
            clock,
            shuffle: ShuffleGenerator::new(),
            default_distribution,
        }
    }

    /// Return the single active box with its tickets, creating, rotating or
    /// healing as needed.
    ///
    /// 1. Fetch active boxes, newest first.
    /// 2. Deactivate all but the newest.
    /// 3. If none is active, create one from the default distribution.
    /// 4. If the active box is exhausted, deactivate it and create a
    ///    replacement with the same distribution.
    ///
    /// If the box loaded in step 4 turns out to have been deactivated by a
    /// concurrent caller, the steps are re-run. A caller whose deactivation
    /// in step 4 finds the box already retired creates nothing and re-runs
    /// the steps too, so a racing reset is never overwritten.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the store failed, or concurrent rotations kept
    ///   the active box changing for every pass; any completed step was
    ///   itself atomic and idempotent, so the read can be retried
    #[tracing::instrument(skip(self))]
    pub async fn get_or_rotate_active_box(&self) -> Result<TicketBox> {
        for pass in 1..=MAX_PASSES {
            let Some(current) = self.newest_active_healed().await? else {
                return self
                    .create(&self.default_distribution, RotationReason::Absent)
                    .await;
            };

            let Some(ticket_box) = self.store.load_box(current.id).await? else {
                tracing::warn!(box_id = %current.id, pass, "Active box vanished, retrying");
                continue;
            };

            if !ticket_box.summary.is_active() {
                tracing::debug!(box_id = %current.id, pass, "Box rotated concurrently, retrying");
                continue;
            }

            if ticket_box.is_exhausted() {
                // Only the caller that retires the box replaces it. Losing here
                // means a concurrent rotation or reset already did.
                if !self.store.deactivate_box(ticket_box.id()).await? {
                    tracing::debug!(
                        box_id = %ticket_box.id(),
                        pass,
                        "Exhausted box retired concurrently, retrying"
                    );
                    continue;
                }
                tracing::info!(box_id = %ticket_box.id(), "Exhausted box deactivated");
                return self
                    .create(&ticket_box.summary.distribution, RotationReason::Exhausted)
                    .await;
            }

            return Ok(ticket_box);
        }

        // Keep losing races: serve the newest box only if it is usable.
        if let Some(summary) = self.store.active_boxes().await?.into_iter().next() {
            if let Some(ticket_box) = self.store.load_box(summary.id).await? {
                if ticket_box.summary.is_active() && !ticket_box.is_exhausted() {
                    return Ok(ticket_box);
                }
            }
        }
        tracing::warn!(passes = MAX_PASSES, "Box rotation did not settle");
        Err(DrawBoxError::StorageUnavailable(
            "Box rotation did not settle, retry the read".to_string(),
        ))
    }

    /// Shuffle and persist a new active box.
    ///
    /// This is the only path that creates tickets.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: nothing was persisted
    pub async fn create_box(&self, distribution: &PrizeDistribution) -> Result<TicketBox> {
        let new_box = self.shuffle.build_box(distribution, self.clock.now());
        let tickets: Vec<Ticket> = new_box
            .slots()
            .iter()
            .map(|slot| Ticket::available(slot.position, slot.rank.clone()))
            .collect();
        let summary = self.store.insert_box(new_box).await?;
        tracing::info!(
            box_id = %summary.id,
            tickets = summary.ticket_count,
            distribution = %summary.distribution,
            "Box created"
        );
        Ok(TicketBox { summary, tickets })
    }

    /// Deactivate every active box, then create one from `distribution`.
    ///
    /// Old boxes keep their tickets and claims as history.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: if it happens after deactivation, the next
    ///   read creates a box from the default distribution
    #[tracing::instrument(skip(self, distribution), fields(distribution = %distribution))]
    pub async fn reset_box(&self, distribution: &PrizeDistribution) -> Result<TicketBox> {
        let retired = self.store.deactivate_all_active().await?;
        tracing::info!(retired = retired.len(), "Active boxes retired for reset");
        self.create(distribution, RotationReason::Reset).await
    }

    async fn create(
        &self,
        distribution: &PrizeDistribution,
        reason: RotationReason,
    ) -> Result<TicketBox> {
        let ticket_box = self.create_box(distribution).await?;
        metrics::record_rotation(reason);
        Ok(ticket_box)
    }

    /// Newest active box after deactivating any others.
    async fn newest_active_healed(&self) -> Result<Option<BoxSummary>> {
        let mut active = self.store.active_boxes().await?.into_iter();
        let Some(newest) = active.next() else {
            return Ok(None);
        };

        let mut healed = 0;
        for stale in active {
            if self.store.deactivate_box(stale.id).await? {
                healed += 1;
                tracing::warn!(
                    kept = %newest.id,
                    deactivated = %stale.id,
                    "Duplicate active box deactivated"
                );
            }
        }
        if healed > 0 {
            metrics::record_self_heal(healed);
        }
        Ok(Some(newest))
    }
}
