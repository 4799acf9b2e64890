//! Box store trait: the storage seam every draw box operation goes through.
//!
//! There is no in-process shared state in the engine; all coordination
//! between concurrent callers happens through the transactional guarantees of
//! a `BoxStore` implementation.
//!
//! # Implementations
//!
//! - `PostgresBoxStore` (in `draw-box-postgres`): production implementation
//! - `InMemoryBoxStore` (in `draw-box-testing`): fast, deterministic testing
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! store can be shared as `Arc<dyn BoxStore>`.

use crate::error::Result;
use crate::types::{BoxId, BoxSummary, ClaimOutcome, ClaimantId, DrawRequest, NewBox, TicketBox};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`BoxStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistent storage for boxes and their tickets.
///
/// Every method is its own unit of work. Failures of the underlying store
/// surface as [`DrawBoxError::StorageUnavailable`](crate::DrawBoxError::StorageUnavailable)
/// and never leave partial effects behind.
pub trait BoxStore: Send + Sync {
    /// Every box currently flagged active, newest first.
    ///
    /// Boxes created at the same instant are ordered by creation sequence,
    /// so "newest" is always well defined.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the store could not be queried
    fn active_boxes(&self) -> StoreFuture<'_, Vec<BoxSummary>>;

    /// Load a box with its full ticket list (ordered by position).
    ///
    /// Returns `None` if no box has this id.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the store could not be queried
    fn load_box(&self, box_id: BoxId) -> StoreFuture<'_, Option<TicketBox>>;

    /// Persist a new active box and all of its tickets atomically.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: nothing was persisted
    fn insert_box(&self, new_box: NewBox) -> StoreFuture<'_, BoxSummary>;

    /// Flip a box to inactive.
    ///
    /// Idempotent: returns `true` only if this call performed the flip,
    /// `false` if the box was already inactive or does not exist.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the status was not changed
    fn deactivate_box(&self, box_id: BoxId) -> StoreFuture<'_, bool>;

    /// Flip every active box to inactive, returning the ids that were flipped.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: no status was changed
    fn deactivate_all_active(&self) -> StoreFuture<'_, Vec<BoxId>>;

    /// Atomically claim a batch of tickets, all or nothing.
    ///
    /// Within a single unit of work:
    ///
    /// 1. the box must exist (`BoxNotFound`) and be active (`BoxInactive`);
    /// 2. exactly the rows `(box_id, position ∈ request, taken = false)` are
    ///    flipped to taken, stamped with `claimant` and `claimed_at`;
    /// 3. if fewer rows flipped than positions requested, the unit of work is
    ///    rolled back and [`ClaimOutcome::Rejected`] lists the positions that
    ///    were not free; otherwise it commits and returns
    ///    [`ClaimOutcome::Committed`].
    ///
    /// Check and mutation are one indivisible step: two callers racing for an
    /// overlapping position can never both commit it.
    ///
    /// # Errors
    ///
    /// - `BoxNotFound`: no box has this id
    /// - `BoxInactive`: the box has been rotated or reset away
    /// - `StorageUnavailable`: rolled back, nothing claimed
    fn claim_tickets<'a>(
        &'a self,
        box_id: BoxId,
        request: &'a DrawRequest,
        claimant: &'a ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> StoreFuture<'a, ClaimOutcome>;

    /// Cheap connectivity probe for readiness checks.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the store is not reachable
    fn ping(&self) -> StoreFuture<'_, ()>;
}
