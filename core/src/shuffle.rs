//! Shuffle Generator.
//!
//! Turns a [`PrizeDistribution`] into a uniformly random permutation of
//! rank-tagged ticket slots. The flat multiset is built in distribution order
//! (`total_quantity` copies of each rank), shuffled with Fisher–Yates, and
//! then each slot takes its index as its permanent position.
//!
//! Invalid distributions (negative quantities, duplicate ranks, empty pools)
//! cannot reach the generator: they are rejected by
//! [`PrizeDistribution::new`] with
//! [`DrawBoxError::InvalidDistribution`](crate::DrawBoxError::InvalidDistribution).

use crate::types::{BoxId, NewBox, PrizeDistribution, Rank, TicketSlot};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Produces shuffled ticket slots. Stateless; touches no storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShuffleGenerator;

impl ShuffleGenerator {
    /// Creates a new `ShuffleGenerator`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Shuffle using the thread-local RNG.
    #[must_use]
    pub fn generate(&self, distribution: &PrizeDistribution) -> Vec<TicketSlot> {
        self.generate_with(distribution, &mut rand::thread_rng())
    }

    /// Shuffle using the supplied RNG (seeded RNGs make tests deterministic).
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        distribution: &PrizeDistribution,
        rng: &mut R,
    ) -> Vec<TicketSlot> {
        let mut ranks = Self::flatten(distribution);

        // Fisher–Yates: walk down from the last index, swapping with a
        // uniformly chosen index at or before the current one.
        for i in (1..ranks.len()).rev() {
            let j = rng.gen_range(0..=i);
            ranks.swap(i, j);
        }

        (0u32..)
            .zip(ranks)
            .map(|(position, rank)| TicketSlot { position, rank })
            .collect()
    }

    /// Shuffle and package the result as a box ready to persist.
    #[must_use]
    pub fn build_box(&self, distribution: &PrizeDistribution, created_at: DateTime<Utc>) -> NewBox {
        let slots = self.generate(distribution);
        NewBox::new(BoxId::new(), distribution.clone(), slots, created_at)
    }

    /// Deterministic pre-shuffle order: every copy of the first rank, then
    /// the second, and so on.
    fn flatten(distribution: &PrizeDistribution) -> Vec<Rank> {
        let mut ranks = Vec::with_capacity(distribution.total_tickets() as usize);
        for tier in distribution.tiers() {
            ranks.extend(std::iter::repeat_n(tier.rank.clone(), tier.total_quantity as usize));
        }
        ranks
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TierRequest;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn count_ranks(slots: &[TicketSlot]) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for slot in slots {
            *counts.entry(slot.rank.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn scenario_distribution_produces_five_slots() {
        let distribution = PrizeDistribution::parse("A:2,B:3").unwrap();
        let slots = ShuffleGenerator::new().generate(&distribution);

        assert_eq!(slots.len(), 5);
        let counts = count_ranks(&slots);
        assert_eq!(counts["A"], 2);
        assert_eq!(counts["B"], 3);
    }

    #[test]
    fn positions_are_the_indices() {
        let distribution = PrizeDistribution::parse("A:3,B:4,C:5").unwrap();
        let slots = ShuffleGenerator::new().generate(&distribution);

        for (index, slot) in slots.iter().enumerate() {
            assert_eq!(slot.position as usize, index);
        }
    }

    #[test]
    fn seeded_shuffles_are_reproducible() {
        let distribution = PrizeDistribution::parse("A:5,B:5,C:5").unwrap();
        let generator = ShuffleGenerator::new();

        let first = generator.generate_with(&distribution, &mut StdRng::seed_from_u64(7));
        let second = generator.generate_with(&distribution, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_moves_ranks_away_from_pre_shuffle_order() {
        // Across many seeds, the top prize must not always stay at position 0.
        let distribution = PrizeDistribution::parse("A:1,B:9").unwrap();
        let generator = ShuffleGenerator::new();

        let moved = (0..50).any(|seed| {
            let slots = generator.generate_with(&distribution, &mut StdRng::seed_from_u64(seed));
            slots[0].rank.as_str() != "A"
        });
        assert!(moved);
    }

    #[test]
    fn top_prize_lands_on_each_position_roughly_uniformly() {
        let distribution = PrizeDistribution::parse("A:1,B:3").unwrap();
        let generator = ShuffleGenerator::new();
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 4000;
        let mut hits = [0u32; 4];

        for _ in 0..trials {
            let slots = generator.generate_with(&distribution, &mut rng);
            let position = slots.iter().find(|s| s.rank.as_str() == "A").unwrap().position;
            hits[position as usize] += 1;
        }

        // Expected 1000 per position; allow a generous band.
        for count in hits {
            assert!((850..=1150).contains(&count), "skewed hits: {hits:?}");
        }
    }

    #[test]
    fn build_box_keeps_distribution_and_time() {
        let distribution = PrizeDistribution::parse("A:1,B:2").unwrap();
        let created_at = Utc::now();
        let new_box = ShuffleGenerator::new().build_box(&distribution, created_at);

        assert_eq!(new_box.distribution(), &distribution);
        assert_eq!(new_box.created_at(), created_at);
        assert_eq!(new_box.slots().len(), 3);
        assert_eq!(new_box.summary().ticket_count, 3);
    }

    proptest! {
        #[test]
        fn rank_counts_match_distribution(quantities in proptest::collection::vec(0i64..20, 1..6)) {
            prop_assume!(quantities.iter().sum::<i64>() > 0);

            let tiers: Vec<TierRequest> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| TierRequest::new(format!("R{i}"), *q))
                .collect();
            let distribution = PrizeDistribution::new(tiers).unwrap();
            let slots = ShuffleGenerator::new().generate(&distribution);

            prop_assert_eq!(slots.len() as u32, distribution.total_tickets());
            let counts = count_ranks(&slots);
            for tier in distribution.tiers() {
                let actual = counts.get(tier.rank.as_str()).copied().unwrap_or(0);
                prop_assert_eq!(actual, tier.total_quantity);
            }
        }
    }
}
