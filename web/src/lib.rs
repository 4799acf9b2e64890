//! Axum integration for the draw box engine.
//!
//! This crate is the thin HTTP shell shared by the service binary:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, headers
//! │  - Caller extraction                    │  ← correlation ids, tracing
//! │  - Error → status mapping               │
//! ├─────────────────────────────────────────┤
//! │         Draw box service                │
//! │  - Lifecycle, draws, projection         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** passes the correlation-id layer
//! 2. **Extract** the caller from gateway headers
//! 3. **Call** the service
//! 4. **Map** `DrawBoxError` to an HTTP status via [`AppError`]

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{
    ADMIN_ROLE, AdminClaimant, AppJson, AppPath, CLAIMANT_ID_HEADER, CLAIMANT_ROLES_HEADER,
    Claimant, CorrelationId,
};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
