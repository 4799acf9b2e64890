//! Default [`PrizeLedger`]: records credits as structured log events.
//!
//! Deployments that own a point/level economy plug in their own ledger; this
//! one lets the service run standalone.

use draw_box_core::ledger::{LedgerError, PrizeLedger};
use draw_box_core::{BoxId, ClaimantId, ClaimedTicket};
use std::future::Future;
use std::pin::Pin;

/// Ledger that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingLedger;

impl PrizeLedger for LoggingLedger {
    fn credit<'a>(
        &'a self,
        claimant: &'a ClaimantId,
        box_id: BoxId,
        tickets: &'a [ClaimedTicket],
    ) -> Pin<Box<dyn Future<Output = Result<(), LedgerError>> + Send + 'a>> {
        Box::pin(async move {
            let ranks: Vec<&str> = tickets.iter().map(|t| t.rank.as_str()).collect();
            tracing::info!(
                claimant = %claimant,
                box_id = %box_id,
                ranks = ?ranks,
                "Prize credit"
            );
            Ok(())
        })
    }
}
