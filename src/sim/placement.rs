//! Position validation with bounded retries
//!
//! Candidates are drawn uniformly inside the region until one keeps the
//! minimum distance to every existing position. When the retry budget runs
//! out the last candidate is used anyway: a slightly crowded table is better
//! than a stalled round.

use glam::Vec2;
use rand::Rng;

use super::region::Region;
use crate::consts::PLACEMENT_RETRY_BUDGET;

/// Result of a placement request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub pos: Vec2,
    /// Samples drawn (1..=budget)
    pub attempts: u32,
    /// True when no candidate met the distance constraint
    pub degraded: bool,
}

/// Samples positions that respect a minimum pairwise distance
#[derive(Debug, Clone, Copy)]
pub struct PositionValidator {
    pub retry_budget: u32,
}

impl Default for PositionValidator {
    fn default() -> Self {
        Self {
            retry_budget: PLACEMENT_RETRY_BUDGET,
        }
    }
}

impl PositionValidator {
    pub fn new(retry_budget: u32) -> Self {
        Self {
            retry_budget: retry_budget.max(1),
        }
    }

    /// Propose a position inside `region` at least `min_distance` from all of
    /// `existing`, falling back to the last sample when the budget is spent
    pub fn propose(
        &self,
        region: &Region,
        existing: &[Vec2],
        min_distance: f32,
        rng: &mut impl Rng,
    ) -> Placement {
        let budget = self.retry_budget.max(1);
        let min_sq = min_distance * min_distance;
        let mut candidate = Vec2::ZERO;

        for attempt in 1..=budget {
            candidate = region.sample(rng);
            if existing.iter().all(|p| p.distance_squared(candidate) >= min_sq) {
                return Placement {
                    pos: candidate,
                    attempts: attempt,
                    degraded: false,
                };
            }
        }

        log::debug!(
            "placement degraded after {} samples (min distance {:.1}, {} neighbours)",
            budget,
            min_distance,
            existing.len()
        );
        Placement {
            pos: candidate,
            attempts: budget,
            degraded: true,
        }
    }

    /// Place `count` positions one after another, each respecting the ones
    /// before it. Returns the positions and how many placements degraded.
    pub fn scatter(
        &self,
        region: &Region,
        count: usize,
        min_distance: f32,
        rng: &mut impl Rng,
    ) -> (Vec<Vec2>, usize) {
        let mut positions = Vec::with_capacity(count);
        let mut degraded = 0;
        for _ in 0..count {
            let placement = self.propose(region, &positions, min_distance, rng);
            if placement.degraded {
                degraded += 1;
            }
            positions.push(placement.pos);
        }
        (positions, degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_empty_table_accepts_first_sample() {
        let mut rng = Pcg32::seed_from_u64(1);
        let placement =
            PositionValidator::default().propose(&Region::new(100.0, 100.0), &[], 30.0, &mut rng);
        assert_eq!(placement.attempts, 1);
        assert!(!placement.degraded);
    }

    #[test]
    fn test_impossible_constraint_degrades_to_last_sample() {
        let mut rng = Pcg32::seed_from_u64(2);
        let region = Region::new(10.0, 10.0);
        let validator = PositionValidator::new(20);
        let placement = validator.propose(&region, &[Vec2::ZERO], 1000.0, &mut rng);
        assert!(placement.degraded);
        assert_eq!(placement.attempts, 20);
        assert!(region.contains(placement.pos));
    }

    #[test]
    fn test_scatter_respects_distance_when_roomy() {
        let mut rng = Pcg32::seed_from_u64(3);
        let (positions, degraded) =
            PositionValidator::default().scatter(&Region::new(800.0, 600.0), 8, 60.0, &mut rng);
        assert_eq!(positions.len(), 8);
        assert_eq!(degraded, 0);
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) >= 60.0);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_result_valid_or_budget_spent(
            seed in any::<u64>(),
            count in 1usize..20,
            budget in 1u32..60,
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let region = Region::new(640.0, 480.0);
            let min_distance = region.diagonal() / count as f32;
            let validator = PositionValidator::new(budget);
            let mut existing = Vec::new();
            for _ in 0..count {
                let placement = validator.propose(&region, &existing, min_distance, &mut rng);
                prop_assert!(placement.attempts <= budget);
                prop_assert!(region.contains(placement.pos));
                let valid = existing.iter().all(|p: &Vec2| p.distance(placement.pos) >= min_distance);
                prop_assert!(valid || (placement.degraded && placement.attempts == budget));
                existing.push(placement.pos);
            }
        }
    }
}
