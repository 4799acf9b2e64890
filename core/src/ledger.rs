//! Prize ledger seam.
//!
//! Point and level bookkeeping lives outside the engine. After a draw commits,
//! the coordinator notifies a [`PrizeLedger`] with what was won; the ledger
//! owns all payout arithmetic.

use crate::types::{BoxId, ClaimantId, ClaimedTicket};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors reported by a ledger collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator notified of committed claims.
pub trait PrizeLedger: Send + Sync {
    /// Credit a claimant for tickets that have already been committed.
    ///
    /// Called at most once per committed draw, never for rejected draws.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the credit could not be recorded. The claim
    /// itself stays committed either way.
    fn credit<'a>(
        &'a self,
        claimant: &'a ClaimantId,
        box_id: BoxId,
        tickets: &'a [ClaimedTicket],
    ) -> Pin<Box<dyn Future<Output = Result<(), LedgerError>> + Send + 'a>>;
}
