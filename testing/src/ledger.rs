//! Recording `PrizeLedger` double.

use draw_box_core::ledger::{LedgerError, PrizeLedger};
use draw_box_core::{BoxId, ClaimantId, ClaimedTicket};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One credit received by [`RecordingLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreditRecord {
    /// Who was credited
    pub claimant: ClaimantId,
    /// Box the tickets came from
    pub box_id: BoxId,
    /// Tickets won
    pub tickets: Vec<ClaimedTicket>,
}

/// Ledger that records every credit and can be told to fail.
///
/// Failed credits are not recorded.
#[derive(Clone, Debug, Default)]
pub struct RecordingLedger {
    credits: Arc<Mutex<Vec<CreditRecord>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingLedger {
    /// Create an empty, healthy ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent credits fail with [`LedgerError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All credits recorded so far, in call order.
    #[must_use]
    pub fn credits(&self) -> Vec<CreditRecord> {
        self.credits.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of credits recorded so far.
    #[must_use]
    pub fn credit_count(&self) -> usize {
        self.credits.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl PrizeLedger for RecordingLedger {
    fn credit<'a>(
        &'a self,
        claimant: &'a ClaimantId,
        box_id: BoxId,
        tickets: &'a [ClaimedTicket],
    ) -> Pin<Box<dyn Future<Output = Result<(), LedgerError>> + Send + 'a>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("recording ledger set to fail".to_string()));
            }
            self.credits
                .lock()
                .map_err(|_| LedgerError::Unavailable("ledger poisoned".to_string()))?
                .push(CreditRecord {
                    claimant: claimant.clone(),
                    box_id,
                    tickets: tickets.to_vec(),
                });
            Ok(())
        })
    }
}
