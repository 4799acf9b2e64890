//! # Draw Box Testing
//!
//! Testing utilities for the draw box engine.
//!
//! This crate provides:
//! - [`InMemoryBoxStore`]: a `BoxStore` with the same all-or-nothing claim
//!   contract as the production store, plus knobs for fault injection
//! - [`RecordingLedger`]: captures ledger credits
//! - [`FixedClock`]: deterministic time
//! - Fixtures and proptest strategies for prize distributions
//!
//! ## Example
//!
//! ```
//! use draw_box_testing::{InMemoryBoxStore, fixtures};
//! use draw_box_core::{ShuffleGenerator, store::BoxStore};
//!
//! # async fn example() -> draw_box_core::Result<()> {
//! let store = InMemoryBoxStore::new();
//! let new_box = ShuffleGenerator::new()
//!     .build_box(&fixtures::scenario_a_distribution(), draw_box_testing::test_clock_time());
//! let summary = store.insert_box(new_box).await?;
//! assert_eq!(summary.ticket_count, 5);
//! # Ok(())
//! # }
//! ```

// Test infrastructure: fixtures are known-valid and fail loudly otherwise.
#![allow(clippy::expect_used)]

use chrono::{DateTime, Utc};
use draw_box_core::environment::Clock;

pub mod in_memory_store;
pub mod ledger;

pub use in_memory_store::InMemoryBoxStore;
pub use ledger::{CreditRecord, RecordingLedger};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use draw_box_testing::mocks::FixedClock;
    /// use draw_box_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::test_clock_time())
    }
}

/// Fixed prize distributions used across the test suites.
pub mod fixtures {
    use draw_box_core::{PrizeDistribution, Rank, TierRequest};

    fn distribution(tiers: &[(&str, u32)]) -> PrizeDistribution {
        let tiers = tiers
            .iter()
            .map(|(rank, quantity)| TierRequest::new(*rank, i64::from(*quantity)))
            .collect();
        PrizeDistribution::new(tiers).expect("fixture distribution is valid")
    }

    /// `{A:2, B:3}`: five tickets.
    #[must_use]
    pub fn scenario_a_distribution() -> PrizeDistribution {
        distribution(&[("A", 2), ("B", 3)])
    }

    /// `{A:1}`: a single ticket.
    #[must_use]
    pub fn single_ticket_distribution() -> PrizeDistribution {
        distribution(&[("A", 1)])
    }

    /// A larger four-tier distribution for stress tests.
    #[must_use]
    pub fn stress_distribution() -> PrizeDistribution {
        distribution(&[("A", 1), ("B", 4), ("C", 15), ("D", 30)])
    }

    /// Look up the configured quantity for a rank name.
    #[must_use]
    pub fn quantity(distribution: &PrizeDistribution, rank: &str) -> Option<u32> {
        Rank::new(rank)
            .ok()
            .and_then(|rank| distribution.quantity_of(&rank))
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use draw_box_core::{PrizeDistribution, TierRequest};
    use proptest::prelude::*;

    /// Strategy producing valid distributions of one to five ranks.
    pub fn distribution_strategy() -> impl Strategy<Value = PrizeDistribution> {
        proptest::collection::vec(0i64..12, 1..=5)
            .prop_filter("at least one ticket", |qs| qs.iter().sum::<i64>() > 0)
            .prop_filter_map("valid distribution", |qs| {
                let tiers = qs
                    .into_iter()
                    .enumerate()
                    .map(|(i, q)| TierRequest::new(format!("R{i}"), q))
                    .collect();
                PrizeDistribution::new(tiers).ok()
            })
    }
}

/// The instant every [`mocks::test_clock`] reports: 2025-01-01 00:00:00 UTC.
#[must_use]
pub fn test_clock_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; output is captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
