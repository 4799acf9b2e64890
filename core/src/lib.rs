//! # Draw Box Core
//!
//! Core types and pure logic for the draw box: a fixed pool of prize-bearing
//! tickets that is shuffled once, offered for drawing, and awarded to at most
//! one claimant per ticket no matter how many claimants race for it.
//!
//! This crate contains no I/O. It provides:
//!
//! - **Domain types**: boxes, tickets, ranks, prize distributions
//! - **Shuffle Generator**: rank-tagged ticket slots in uniformly random order
//! - **Inventory Projector**: the caller-visible view of a box (rank hiding)
//! - **Seams**: the [`store::BoxStore`], [`ledger::PrizeLedger`] and
//!   [`environment::Clock`] traits that the service layer is built against
//!
//! ## Architecture
//!
//! ```text
//!   GetBoxState ──► Lifecycle Manager ──► Shuffle Generator (on create/rotate)
//!        │                 │
//!        │                 └──────► BoxStore (active boxes, insert, deactivate)
//!        ▼
//!   Inventory Projector ──► { box_id, tickets[rank|null], prize_info }
//!
//!   DrawTickets ──► Draw Coordinator ──► BoxStore::claim_tickets (atomic, all-or-nothing)
//!                                   └──► PrizeLedger (only after commit)
//! ```
//!
//! ## Example
//!
//! ```
//! use draw_box_core::{PrizeDistribution, ShuffleGenerator, project_box_view};
//!
//! let distribution = PrizeDistribution::parse("A:2,B:3").unwrap();
//! let slots = ShuffleGenerator::new().generate(&distribution);
//! assert_eq!(slots.len(), 5);
//! ```

pub mod environment;
pub mod error;
pub mod ledger;
pub mod projector;
pub mod shuffle;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{DrawBoxError, Result};
pub use projector::{BoxView, PrizeInfo, TicketView, project_box_view};
pub use shuffle::ShuffleGenerator;
pub use types::{
    BoxId, BoxStatus, BoxSummary, ClaimOutcome, ClaimantId, ClaimedTicket, DrawRequest,
    MAX_TICKETS_PER_BOX, NewBox, PrizeDistribution, PrizeTier, Rank, Ticket, TicketBox,
    TicketSlot, TierRequest,
};
