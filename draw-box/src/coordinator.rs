//! Draw Coordinator.
//!
//! Claims a batch of tickets for one claimant, all or nothing. The check
//! ("is every requested ticket still free?") and the mutation happen inside a
//! single [`BoxStore::claim_tickets`] unit of work, so two callers racing for
//! the same position can never both win it.

use crate::metrics;
use draw_box_core::environment::Clock;
use draw_box_core::ledger::PrizeLedger;
use draw_box_core::store::BoxStore;
use draw_box_core::{
    BoxId, ClaimOutcome, ClaimantId, ClaimedTicket, DrawBoxError, DrawRequest, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Tickets claimed by a committed draw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    /// Box the tickets belong to
    pub box_id: BoxId,
    /// Claimed tickets in ascending position order
    pub tickets: Vec<ClaimedTicket>,
}

/// Coordinates atomic ticket claims and post-commit ledger notification.
#[derive(Clone)]
pub struct DrawCoordinator {
    store: Arc<dyn BoxStore>,
    ledger: Arc<dyn PrizeLedger>,
    clock: Arc<dyn Clock>,
    max_positions: usize,
}

impl DrawCoordinator {
    /// Create a coordinator that accepts at most `max_positions` per draw.
    #[must_use]
    pub fn new(
        store: Arc<dyn BoxStore>,
        ledger: Arc<dyn PrizeLedger>,
        clock: Arc<dyn Clock>,
        max_positions: usize,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            max_positions,
        }
    }

    /// Claim every position in `positions` for `claimant`, or none of them.
    ///
    /// The ledger is credited only after the claim has committed. A ledger
    /// failure is logged and counted; the claim stays committed and the draw
    /// still succeeds.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: no positions, too many positions, or a position
    ///   outside the box
    /// - `BoxNotFound`: no box has this id
    /// - `BoxInactive`: the box has been rotated or reset away
    /// - `AlreadyTaken`: at least one position was not free; nothing changed
    /// - `StorageUnavailable`: rolled back, or rejected but not classifiable;
    ///   safe to retry after reading state
    #[tracing::instrument(skip(self, positions, claimant), fields(claimant = %claimant))]
    pub async fn draw_tickets(
        &self,
        box_id: BoxId,
        positions: impl IntoIterator<Item = u32>,
        claimant: &ClaimantId,
    ) -> Result<DrawResult> {
        let started = Instant::now();
        let result = self.claim(box_id, positions, claimant).await;
        match &result {
            Ok(draw) => metrics::record_draw_committed(draw.tickets.len(), started.elapsed()),
            Err(error) => metrics::record_draw_failed(error, started.elapsed()),
        }
        result
    }

    async fn claim(
        &self,
        box_id: BoxId,
        positions: impl IntoIterator<Item = u32>,
        claimant: &ClaimantId,
    ) -> Result<DrawResult> {
        let request = DrawRequest::new(positions)?;
        if request.len() > self.max_positions {
            return Err(DrawBoxError::InvalidRequest(format!(
                "At most {} positions may be drawn at once, got {}",
                self.max_positions,
                request.len()
            )));
        }

        let outcome = self
            .store
            .claim_tickets(box_id, &request, claimant, self.clock.now())
            .await?;

        match outcome {
            ClaimOutcome::Committed(tickets) => {
                tracing::info!(
                    box_id = %box_id,
                    positions = ?tickets.iter().map(|t| t.position).collect::<Vec<_>>(),
                    "Tickets claimed"
                );
                self.notify_ledger(claimant, box_id, &tickets).await;
                Ok(DrawResult { box_id, tickets })
            }
            ClaimOutcome::Rejected(conflicts) => {
                Err(self.rejection(box_id, &request, conflicts).await)
            }
        }
    }

    /// Classify a rejected claim. Positions past the end of the box are a
    /// malformed request; anything else was taken by someone first. If the
    /// box cannot be read, the storage error is returned as is.
    async fn rejection(
        &self,
        box_id: BoxId,
        request: &DrawRequest,
        conflicts: Vec<u32>,
    ) -> DrawBoxError {
        match self.store.load_box(box_id).await {
            Ok(Some(ticket_box)) if request.max_position() >= ticket_box.summary.ticket_count => {
                DrawBoxError::InvalidRequest(format!(
                    "Position {} is outside box {box_id} of {} tickets",
                    request.max_position(),
                    ticket_box.summary.ticket_count
                ))
            }
            Ok(_) => {
                tracing::debug!(box_id = %box_id, positions = ?conflicts, "Draw rejected");
                DrawBoxError::AlreadyTaken {
                    box_id,
                    positions: conflicts,
                }
            }
            Err(error) => {
                tracing::warn!(
                    box_id = %box_id,
                    error = %error,
                    "Could not classify rejected draw"
                );
                error
            }
        }
    }

    async fn notify_ledger(
        &self,
        claimant: &ClaimantId,
        box_id: BoxId,
        tickets: &[ClaimedTicket],
    ) {
        if let Err(error) = self.ledger.credit(claimant, box_id, tickets).await {
            metrics::record_ledger_failure();
            tracing::error!(
                box_id = %box_id,
                claimant = %claimant,
                error = %error,
                "Ledger credit failed after committed draw"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lifecycle::BoxLifecycleManager;
    use draw_box_core::store::StoreFuture;
    use draw_box_core::{BoxSummary, DateTime, NewBox, TicketBox, Utc};
    use draw_box_testing::{InMemoryBoxStore, RecordingLedger, fixtures, test_clock};

    /// Claims go through; every box read fails.
    struct UnreadableStore(InMemoryBoxStore);

    impl BoxStore for UnreadableStore {
        fn active_boxes(&self) -> StoreFuture<'_, Vec<BoxSummary>> {
            self.0.active_boxes()
        }

        fn load_box(&self, _box_id: BoxId) -> StoreFuture<'_, Option<TicketBox>> {
            Box::pin(async { Err(DrawBoxError::StorageUnavailable("read timed out".to_string())) })
        }

        fn insert_box(&self, new_box: NewBox) -> StoreFuture<'_, BoxSummary> {
            self.0.insert_box(new_box)
        }

        fn deactivate_box(&self, box_id: BoxId) -> StoreFuture<'_, bool> {
            self.0.deactivate_box(box_id)
        }

        fn deactivate_all_active(&self) -> StoreFuture<'_, Vec<BoxId>> {
            self.0.deactivate_all_active()
        }

        fn claim_tickets<'a>(
            &'a self,
            box_id: BoxId,
            request: &'a DrawRequest,
            claimant: &'a ClaimantId,
            claimed_at: DateTime<Utc>,
        ) -> StoreFuture<'a, ClaimOutcome> {
            self.0.claim_tickets(box_id, request, claimant, claimed_at)
        }

        fn ping(&self) -> StoreFuture<'_, ()> {
            self.0.ping()
        }
    }

    struct Harness {
        store: InMemoryBoxStore,
        ledger: RecordingLedger,
        coordinator: DrawCoordinator,
        ticket_box: TicketBox,
    }

    async fn harness() -> Harness {
        let store = InMemoryBoxStore::new();
        let ledger = RecordingLedger::new();
        let lifecycle = BoxLifecycleManager::new(
            Arc::new(store.clone()),
            Arc::new(test_clock()),
            fixtures::scenario_a_distribution(),
        );
        let ticket_box = lifecycle.get_or_rotate_active_box().await.unwrap();
        let coordinator = DrawCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(ledger.clone()),
            Arc::new(test_clock()),
            3,
        );
        Harness {
            store,
            ledger,
            coordinator,
            ticket_box,
        }
    }

    fn alice() -> ClaimantId {
        ClaimantId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn committed_draw_discloses_ranks_and_credits_ledger() {
        let h = harness().await;
        let result = h
            .coordinator
            .draw_tickets(h.ticket_box.id(), [2, 0], &alice())
            .await
            .unwrap();

        let positions: Vec<u32> = result.tickets.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2]);
        for claimed in &result.tickets {
            assert_eq!(claimed.rank, h.ticket_box.ticket(claimed.position).unwrap().rank);
        }
        assert_eq!(h.ledger.credit_count(), 1);
        assert_eq!(h.ledger.credits()[0].tickets, result.tickets);
    }

    #[tokio::test]
    async fn overlapping_draw_is_rejected_without_mutation() {
        let h = harness().await;
        let box_id = h.ticket_box.id();
        h.coordinator.draw_tickets(box_id, [1], &alice()).await.unwrap();

        let bob = ClaimantId::new("bob").unwrap();
        let err = h.coordinator.draw_tickets(box_id, [1, 3], &bob).await.unwrap_err();
        assert_eq!(
            err,
            DrawBoxError::AlreadyTaken {
                box_id,
                positions: vec![1]
            }
        );

        let loaded = h.store.load_box(box_id).await.unwrap().unwrap();
        assert!(!loaded.ticket(3).unwrap().taken);
        assert_eq!(loaded.ticket(1).unwrap().claimed_by, Some(alice()));
        assert_eq!(h.ledger.credit_count(), 1);
    }

    #[tokio::test]
    async fn out_of_range_position_is_invalid() {
        let h = harness().await;
        let err = h
            .coordinator
            .draw_tickets(h.ticket_box.id(), [0, 5], &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, DrawBoxError::InvalidRequest(_)));
        assert_eq!(h.ticket_box.remaining(), 5);
        let loaded = h.store.load_box(h.ticket_box.id()).await.unwrap().unwrap();
        assert_eq!(loaded.remaining(), 5);
    }

    #[tokio::test]
    async fn empty_and_oversized_requests_are_invalid() {
        let h = harness().await;
        let empty = h
            .coordinator
            .draw_tickets(h.ticket_box.id(), Vec::new(), &alice())
            .await
            .unwrap_err();
        assert!(matches!(empty, DrawBoxError::InvalidRequest(_)));

        let oversized = h
            .coordinator
            .draw_tickets(h.ticket_box.id(), [0, 1, 2, 3], &alice())
            .await
            .unwrap_err();
        assert!(matches!(oversized, DrawBoxError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unknown_box_is_not_found() {
        let h = harness().await;
        let missing = BoxId::new();
        let err = h.coordinator.draw_tickets(missing, [0], &alice()).await.unwrap_err();
        assert_eq!(err, DrawBoxError::BoxNotFound(missing));
    }

    #[tokio::test]
    async fn ledger_failure_does_not_fail_draw() {
        let h = harness().await;
        h.ledger.set_failing(true);
        let result = h
            .coordinator
            .draw_tickets(h.ticket_box.id(), [4], &alice())
            .await
            .unwrap();
        assert_eq!(result.tickets.len(), 1);
        assert_eq!(h.ledger.credit_count(), 0);

        let loaded = h.store.load_box(h.ticket_box.id()).await.unwrap().unwrap();
        assert!(loaded.ticket(4).unwrap().taken);
    }

    #[tokio::test]
    async fn unclassifiable_rejection_reports_storage_failure() {
        let h = harness().await;
        let coordinator = DrawCoordinator::new(
            Arc::new(UnreadableStore(h.store.clone())),
            Arc::new(h.ledger.clone()),
            Arc::new(test_clock()),
            3,
        );

        let err = coordinator
            .draw_tickets(h.ticket_box.id(), [0, 7], &alice())
            .await
            .unwrap_err();

        assert!(matches!(err, DrawBoxError::StorageUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(h.store.snapshot(h.ticket_box.id()).unwrap().remaining(), 5);
        assert_eq!(h.ledger.credit_count(), 0);
    }
}
