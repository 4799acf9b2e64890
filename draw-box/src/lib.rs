//! Draw box: a lottery-ticket inventory engine.
//!
//! A fixed pool of prize-bearing tickets is shuffled once, offered for
//! drawing, and every ticket is awarded to at most one claimant even when
//! many claimants race for it.
//!
//! # Architecture
//!
//! ```text
//!            GET /api/box                POST /api/box/:id/draws
//!                 │                                │
//!                 ▼                                ▼
//!   ┌──────────────────────────┐      ┌──────────────────────────┐
//!   │   BoxLifecycleManager    │      │     DrawCoordinator      │
//!   │  create / rotate / heal  │      │  atomic all-or-nothing   │
//!   └──────────────────────────┘      └──────────────────────────┘
//!         │            │                     │           │
//!         │            ▼                     │           ▼
//!         │   ShuffleGenerator               │      PrizeLedger
//!         ▼                                  ▼     (after commit)
//!   ┌─────────────────────────────────────────────────────────┐
//!   │                 BoxStore (PostgreSQL)                   │
//!   └─────────────────────────────────────────────────────────┘
//!         │
//!         ▼
//!   project_box_view: ranks of undrawn tickets hidden
//! ```
//!
//! There is no in-process shared mutable state: all coordination between
//! concurrent callers goes through the store's transactions.
//!
//! # Key Guarantees
//!
//! - A ticket is claimed at most once, ever.
//! - A draw claims all requested tickets or none of them.
//! - Duplicate active boxes are collapsed on the next read.
//! - An exhausted box is replaced transparently on the next read.

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod coordinator;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod retry;
pub mod server;
pub mod service;

pub use config::{Config, ConfigError, DrawConfig};
pub use coordinator::{DrawCoordinator, DrawResult};
pub use ledger::LoggingLedger;
pub use lifecycle::BoxLifecycleManager;
pub use service::DrawBoxService;
