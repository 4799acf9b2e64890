//! In-memory `BoxStore` for fast, deterministic tests.
//!
//! All state sits behind one mutex, so every operation is a single
//! indivisible unit of work. `claim_tickets` verifies every requested
//! position before mutating any of them, which gives the same all-or-nothing
//! behaviour as the conditional update in the Postgres store.

use chrono::{DateTime, Utc};
use draw_box_core::store::{BoxStore, StoreFuture};
use draw_box_core::{
    BoxId, BoxStatus, BoxSummary, ClaimOutcome, ClaimantId, ClaimedTicket, DrawBoxError,
    DrawRequest, NewBox, Result, Ticket, TicketBox,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct StoredBox {
    summary: BoxSummary,
    seq: u64,
    tickets: Vec<Ticket>,
}

#[derive(Debug, Default)]
struct State {
    boxes: HashMap<BoxId, StoredBox>,
    next_seq: u64,
}

/// In-memory box store.
///
/// Cloning shares the underlying state, like cloning a connection pool.
///
/// # Example
///
/// ```
/// use draw_box_testing::InMemoryBoxStore;
///
/// let store = InMemoryBoxStore::new();
/// assert_eq!(store.box_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoxStore {
    state: Arc<Mutex<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryBoxStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StorageUnavailable`
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Flip a box back to active regardless of its current status.
    ///
    /// Used to reproduce the "several active boxes" anomaly. Returns `false`
    /// if the box does not exist.
    pub fn force_activate(&self, box_id: BoxId) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        state.boxes.get_mut(&box_id).is_some_and(|stored| {
            stored.summary.status = BoxStatus::Active;
            true
        })
    }

    /// A box with its tickets, read without going through the trait.
    ///
    /// Ignores [`InMemoryBoxStore::set_unavailable`], so assertions still work
    /// while failures are being injected.
    #[must_use]
    pub fn snapshot(&self, box_id: BoxId) -> Option<TicketBox> {
        let state = self.state.lock().ok()?;
        state.boxes.get(&box_id).map(|stored| TicketBox {
            summary: stored.summary.clone(),
            tickets: stored.tickets.clone(),
        })
    }

    /// Number of boxes ever stored.
    #[must_use]
    pub fn box_count(&self) -> usize {
        self.state.lock().map(|s| s.boxes.len()).unwrap_or_default()
    }

    /// Number of boxes currently flagged active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.boxes.values().filter(|b| b.summary.is_active()).count())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DrawBoxError::StorageUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| DrawBoxError::StorageUnavailable("in-memory store poisoned".to_string()))
    }

    fn active_sync(&self) -> Result<Vec<BoxSummary>> {
        let state = self.lock()?;
        let mut active: Vec<&StoredBox> = state
            .boxes
            .values()
            .filter(|stored| stored.summary.is_active())
            .collect();
        active.sort_by(|a, b| {
            b.summary
                .created_at
                .cmp(&a.summary.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(active.into_iter().map(|s| s.summary.clone()).collect())
    }

    fn load_sync(&self, box_id: BoxId) -> Result<Option<TicketBox>> {
        let state = self.lock()?;
        Ok(state.boxes.get(&box_id).map(|stored| TicketBox {
            summary: stored.summary.clone(),
            tickets: stored.tickets.clone(),
        }))
    }

    fn insert_sync(&self, new_box: &NewBox) -> Result<BoxSummary> {
        let mut state = self.lock()?;
        if state.boxes.contains_key(&new_box.id()) {
            return Err(DrawBoxError::StorageUnavailable(format!(
                "Box {} already exists",
                new_box.id()
            )));
        }
        let summary = new_box.summary();
        let tickets = new_box
            .slots()
            .iter()
            .map(|slot| Ticket::available(slot.position, slot.rank.clone()))
            .collect();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.boxes.insert(
            new_box.id(),
            StoredBox {
                summary: summary.clone(),
                seq,
                tickets,
            },
        );
        Ok(summary)
    }

    fn deactivate_sync(&self, box_id: BoxId) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(match state.boxes.get_mut(&box_id) {
            Some(stored) if stored.summary.is_active() => {
                stored.summary.status = BoxStatus::Inactive;
                true
            }
            _ => false,
        })
    }

    fn deactivate_all_sync(&self) -> Result<Vec<BoxId>> {
        let mut state = self.lock()?;
        let mut flipped = Vec::new();
        for (id, stored) in &mut state.boxes {
            if stored.summary.is_active() {
                stored.summary.status = BoxStatus::Inactive;
                flipped.push(*id);
            }
        }
        Ok(flipped)
    }

    fn claim_sync(
        &self,
        box_id: BoxId,
        request: &DrawRequest,
        claimant: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let mut state = self.lock()?;
        let stored = state
            .boxes
            .get_mut(&box_id)
            .ok_or(DrawBoxError::BoxNotFound(box_id))?;
        if !stored.summary.is_active() {
            return Err(DrawBoxError::BoxInactive(box_id));
        }

        // Tickets are stored in position order, so position == index.
        let not_free: Vec<u32> = request
            .positions()
            .filter(|&p| {
                usize::try_from(p)
                    .ok()
                    .and_then(|i| stored.tickets.get(i))
                    .is_none_or(|t| t.taken)
            })
            .collect();
        if !not_free.is_empty() {
            return Ok(ClaimOutcome::Rejected(not_free));
        }

        let mut claimed = Vec::with_capacity(request.len());
        for position in request.positions() {
            if let Some(ticket) = usize::try_from(position)
                .ok()
                .and_then(|i| stored.tickets.get_mut(i))
            {
                ticket.taken = true;
                ticket.claimed_by = Some(claimant.clone());
                ticket.claimed_at = Some(claimed_at);
                claimed.push(ClaimedTicket {
                    position,
                    rank: ticket.rank.clone(),
                });
            }
        }
        Ok(ClaimOutcome::Committed(claimed))
    }
}

impl BoxStore for InMemoryBoxStore {
    fn active_boxes(&self) -> StoreFuture<'_, Vec<BoxSummary>> {
        Box::pin(async move { self.active_sync() })
    }

    fn load_box(&self, box_id: BoxId) -> StoreFuture<'_, Option<TicketBox>> {
        Box::pin(async move { self.load_sync(box_id) })
    }

    fn insert_box(&self, new_box: NewBox) -> StoreFuture<'_, BoxSummary> {
        Box::pin(async move { self.insert_sync(&new_box) })
    }

    fn deactivate_box(&self, box_id: BoxId) -> StoreFuture<'_, bool> {
        Box::pin(async move { self.deactivate_sync(box_id) })
    }

    fn deactivate_all_active(&self) -> StoreFuture<'_, Vec<BoxId>> {
        Box::pin(async move { self.deactivate_all_sync() })
    }

    fn claim_tickets<'a>(
        &'a self,
        box_id: BoxId,
        request: &'a DrawRequest,
        claimant: &'a ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> StoreFuture<'a, ClaimOutcome> {
        Box::pin(async move { self.claim_sync(box_id, request, claimant, claimed_at) })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.lock().map(drop) })
    }
}
