//! `PostgreSQL` box store for the draw box engine.
//!
//! This crate provides the production implementation of the `BoxStore`
//! trait from `draw-box-core`. It uses runtime-checked sqlx queries and
//! supports:
//!
//! - Atomic, all-or-nothing ticket claims via a conditional `UPDATE`
//! - Box insertion with all tickets in a single transaction
//! - Connection pooling with per-connection statement timeouts
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use draw_box_postgres::{PostgresBoxStore, PostgresConfig};
//!
//! # async fn example() -> draw_box_core::Result<()> {
//! let config = PostgresConfig::new("postgres://localhost/draw_box");
//! let store = PostgresBoxStore::connect(&config).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod rows;
mod store;

pub use store::PostgresBoxStore;

use std::time::Duration;

/// Connection settings for [`PostgresBoxStore::connect`].
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Minimum number of idle connections kept open
    pub min_connections: u32,
    /// How long to wait for a connection from the pool
    pub connect_timeout: Duration,
    /// How long a connection may sit idle before being closed
    pub idle_timeout: Duration,
    /// Server-side `statement_timeout` applied to every connection
    pub statement_timeout: Duration,
}

impl PostgresConfig {
    /// Settings with default pool sizing for the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            statement_timeout: Duration::from_secs(60),
        }
    }
}
