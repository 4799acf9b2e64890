//! Business metrics for the draw box service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `draw_box_draws_total{outcome}` - Draw attempts by outcome
//!   (`committed`, `already_taken`, `box_inactive`, `invalid`, `error`)
//! - `draw_box_tickets_claimed_total` - Tickets claimed by committed draws
//! - `draw_box_rotations_total{reason}` - Boxes created by reason
//!   (`absent`, `exhausted`, `reset`)
//! - `draw_box_self_heal_total` - Duplicate active boxes deactivated
//! - `draw_box_ledger_failures_total` - Ledger credits that failed after commit
//!
//! ## Gauges
//! - `draw_box_tickets_remaining` - Untaken tickets in the last served box
//!
//! ## Histograms
//! - `draw_box_draw_duration_seconds` - Time spent in the draw coordinator

use draw_box_core::DrawBoxError;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::time::Duration;

/// Register descriptions for every draw box metric.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!("draw_box_draws_total", "Draw attempts by outcome");
    describe_counter!(
        "draw_box_tickets_claimed_total",
        "Tickets claimed by committed draws"
    );
    describe_counter!("draw_box_rotations_total", "Boxes created, by reason");
    describe_counter!(
        "draw_box_self_heal_total",
        "Duplicate active boxes deactivated during reads"
    );
    describe_counter!(
        "draw_box_ledger_failures_total",
        "Ledger credits that failed after a committed draw"
    );
    describe_gauge!(
        "draw_box_tickets_remaining",
        "Untaken tickets in the most recently served box"
    );
    describe_histogram!(
        "draw_box_draw_duration_seconds",
        "Time spent claiming tickets"
    );

    tracing::info!("Business metrics registered");
}

/// Why a new box was created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationReason {
    /// No active box existed
    Absent,
    /// The active box ran out of tickets
    Exhausted,
    /// An administrator reset the box
    Reset,
}

impl RotationReason {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Exhausted => "exhausted",
            Self::Reset => "reset",
        }
    }
}

/// Record a committed draw.
pub fn record_draw_committed(tickets: usize, elapsed: Duration) {
    metrics::counter!("draw_box_draws_total", "outcome" => "committed").increment(1);
    metrics::counter!("draw_box_tickets_claimed_total")
        .increment(u64::try_from(tickets).unwrap_or(u64::MAX));
    metrics::histogram!("draw_box_draw_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a failed draw.
pub fn record_draw_failed(error: &DrawBoxError, elapsed: Duration) {
    let outcome = match error {
        DrawBoxError::AlreadyTaken { .. } => "already_taken",
        DrawBoxError::BoxInactive(_) => "box_inactive",
        DrawBoxError::InvalidRequest(_)
        | DrawBoxError::InvalidDistribution(_)
        | DrawBoxError::BoxNotFound(_) => "invalid",
        DrawBoxError::StorageUnavailable(_) => "error",
    };
    metrics::counter!("draw_box_draws_total", "outcome" => outcome).increment(1);
    metrics::histogram!("draw_box_draw_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record the creation of a box.
pub fn record_rotation(reason: RotationReason) {
    metrics::counter!("draw_box_rotations_total", "reason" => reason.as_str()).increment(1);
}

/// Record duplicate active boxes collapsed by self-healing.
pub fn record_self_heal(deactivated: usize) {
    metrics::counter!("draw_box_self_heal_total")
        .increment(u64::try_from(deactivated).unwrap_or(u64::MAX));
}

/// Record a ledger failure after commit.
pub fn record_ledger_failure() {
    metrics::counter!("draw_box_ledger_failures_total").increment(1);
}

/// Publish the remaining ticket count of the box just served.
pub fn set_tickets_remaining(remaining: u32) {
    metrics::gauge!("draw_box_tickets_remaining").set(f64::from(remaining));
}
