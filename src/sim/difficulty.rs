//! Difficulty tiers and pattern selection
//!
//! Tiers are keyed by a score threshold and sorted ascending. The active tier
//! is the one with the highest threshold not above the score; the first tier
//! is the floor. Pattern choice avoids anything in the short history.

use std::collections::VecDeque;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::pattern::PatternKind;
use crate::consts::PATTERN_HISTORY_LEN;
use crate::error::ArrangeError;

/// One eligible pattern within a tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub kind: PatternKind,
    /// Inclusive card count range
    pub min_cards: u32,
    pub max_cards: u32,
    /// Pattern speed in the pattern's own unit (ignored by static patterns)
    #[serde(default)]
    pub speed: f32,
}

impl PatternRule {
    pub const fn new(kind: PatternKind, min_cards: u32, max_cards: u32, speed: f32) -> Self {
        Self {
            kind,
            min_cards,
            max_cards,
            speed,
        }
    }

    pub fn sample_count(&self, rng: &mut impl Rng) -> usize {
        rng.random_range(self.min_cards..=self.max_cards.max(self.min_cards)) as usize
    }
}

/// Endless speed-up applied by the last tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfiniteScaling {
    /// Added to the speed multiplier per round spent in the tier
    pub speed_increment: f32,
    /// Largest multiplier ever applied
    pub speed_cap: f32,
}

/// A difficulty bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    pub threshold: u64,
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub infinite: Option<InfiniteScaling>,
}

impl DifficultyTier {
    pub fn rule(&self, kind: PatternKind) -> Option<&PatternRule> {
        self.patterns.iter().find(|r| r.kind == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.patterns.iter().map(|r| r.kind)
    }

    /// Speed multiplier after `rounds` rounds in this tier
    pub fn speed_multiplier(&self, rounds: u32) -> f32 {
        match self.infinite {
            Some(scaling) => {
                let cap = scaling.speed_cap.max(1.0);
                (1.0 + scaling.speed_increment * rounds as f32).min(cap)
            }
            None => 1.0,
        }
    }

    fn validate(&self, index: usize) -> Result<(), ArrangeError> {
        if self.patterns.is_empty() {
            return Err(ArrangeError::EmptyPatternSet { tier: index });
        }
        for rule in &self.patterns {
            if rule.min_cards == 0 {
                return Err(ArrangeError::InvalidTier {
                    tier: index,
                    reason: format!("{} allows zero cards", rule.kind),
                });
            }
            if rule.min_cards > rule.max_cards {
                return Err(ArrangeError::InvalidTier {
                    tier: index,
                    reason: format!(
                        "{} card range {}..={} is empty",
                        rule.kind, rule.min_cards, rule.max_cards
                    ),
                });
            }
            if self.patterns.iter().filter(|r| r.kind == rule.kind).count() > 1 {
                return Err(ArrangeError::InvalidTier {
                    tier: index,
                    reason: format!("{} listed twice", rule.kind),
                });
            }
        }
        Ok(())
    }
}

/// Recently chosen patterns, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHistory {
    recent: VecDeque<PatternKind>,
    capacity: usize,
}

impl Default for PatternHistory {
    fn default() -> Self {
        Self::new(PATTERN_HISTORY_LEN)
    }
}

impl PatternHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    /// Record a choice, evicting the oldest once over capacity
    pub fn push(&mut self, kind: PatternKind) {
        self.recent.push_back(kind);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    pub fn contains(&self, kind: PatternKind) -> bool {
        self.recent.contains(&kind)
    }

    pub fn last(&self) -> Option<PatternKind> {
        self.recent.back().copied()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.recent.iter().copied()
    }
}

/// Score-to-tier mapping and pattern selection
#[derive(Debug, Clone)]
pub struct DifficultyLedger {
    tiers: Vec<DifficultyTier>,
}

impl DifficultyLedger {
    /// Validate and sort tiers; any table problem is fatal
    pub fn new(mut tiers: Vec<DifficultyTier>) -> Result<Self, ArrangeError> {
        if tiers.is_empty() {
            return Err(ArrangeError::NoTiers);
        }
        tiers.sort_by_key(|t| t.threshold);
        for (index, tier) in tiers.iter().enumerate() {
            tier.validate(index)?;
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[DifficultyTier] {
        &self.tiers
    }

    pub fn tier(&self, index: usize) -> Option<&DifficultyTier> {
        self.tiers.get(index)
    }

    /// Tier with the greatest threshold not above `score` (tier 0 as floor)
    pub fn select_tier(&self, score: u64) -> (usize, &DifficultyTier) {
        let index = self
            .tiers
            .iter()
            .rposition(|t| t.threshold <= score)
            .unwrap_or(0);
        (index, &self.tiers[index])
    }

    /// Pick the next pattern for a tier, steering away from recent choices
    pub fn select_pattern(
        &self,
        tier_index: usize,
        history: &mut PatternHistory,
        rng: &mut impl Rng,
    ) -> Result<PatternKind, ArrangeError> {
        let tier = self
            .tiers
            .get(tier_index)
            .filter(|t| !t.patterns.is_empty())
            .ok_or(ArrangeError::EmptyPatternSet { tier: tier_index })?;

        if tier.patterns.len() == 1 {
            let kind = tier.patterns[0].kind;
            history.push(kind);
            return Ok(kind);
        }

        let mut available: Vec<PatternKind> =
            tier.kinds().filter(|k| !history.contains(*k)).collect();
        if available.is_empty() {
            let last = history.last();
            available = tier.kinds().filter(|k| Some(*k) != last).collect();
        }

        let kind = *available
            .choose(rng)
            .ok_or(ArrangeError::EmptyPatternSet { tier: tier_index })?;
        history.push(kind);
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn tier(threshold: u64, kinds: &[PatternKind]) -> DifficultyTier {
        DifficultyTier {
            threshold,
            patterns: kinds
                .iter()
                .map(|&k| PatternRule::new(k, 4, 8, 50.0))
                .collect(),
            infinite: None,
        }
    }

    #[test]
    fn test_select_tier_highest_threshold_at_or_below() {
        let ledger = DifficultyLedger::new(vec![
            tier(500, &[PatternKind::Wave]),
            tier(0, &[PatternKind::Grid]),
            tier(100, &[PatternKind::Columns]),
        ])
        .unwrap();

        let (index, t) = ledger.select_tier(250);
        assert_eq!(index, 1);
        assert_eq!(t.threshold, 100);
        assert_eq!(ledger.select_tier(0).1.threshold, 0);
        assert_eq!(ledger.select_tier(100).1.threshold, 100);
        assert_eq!(ledger.select_tier(10_000).1.threshold, 500);
    }

    #[test]
    fn test_first_tier_is_floor() {
        let ledger = DifficultyLedger::new(vec![tier(10, &[PatternKind::Grid])]).unwrap();
        assert_eq!(ledger.select_tier(3).0, 0);
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            DifficultyLedger::new(Vec::new()),
            Err(ArrangeError::NoTiers)
        ));
        assert!(matches!(
            DifficultyLedger::new(vec![tier(0, &[PatternKind::Grid]), tier(5, &[])]),
            Err(ArrangeError::EmptyPatternSet { tier: 1 })
        ));

        let mut bad = tier(0, &[PatternKind::Grid]);
        bad.patterns[0].min_cards = 9;
        assert!(matches!(
            DifficultyLedger::new(vec![bad]),
            Err(ArrangeError::InvalidTier { tier: 0, .. })
        ));
    }

    #[test]
    fn test_single_pattern_tier_always_returns_it() {
        let ledger = DifficultyLedger::new(vec![tier(0, &[PatternKind::Pulse])]).unwrap();
        let mut history = PatternHistory::default();
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..5 {
            assert_eq!(
                ledger.select_pattern(0, &mut history, &mut rng).unwrap(),
                PatternKind::Pulse
            );
        }
    }

    #[test]
    fn test_three_patterns_never_repeat_back_to_back() {
        let kinds = [PatternKind::Grid, PatternKind::Wave, PatternKind::Pulse];
        let ledger = DifficultyLedger::new(vec![tier(0, &kinds)]).unwrap();
        let mut history = PatternHistory::default();
        let mut rng = Pcg32::seed_from_u64(8);
        let picks: Vec<_> = (0..30)
            .map(|_| ledger.select_pattern(0, &mut history, &mut rng).unwrap())
            .collect();
        assert_eq!(picks[..3].iter().filter(|k| **k == picks[0]).count(), 1);
        for pair in picks.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_two_patterns_alternate() {
        let ledger =
            DifficultyLedger::new(vec![tier(0, &[PatternKind::Grid, PatternKind::Wave])]).unwrap();
        let mut history = PatternHistory::default();
        let mut rng = Pcg32::seed_from_u64(6);
        let picks: Vec<_> = (0..10)
            .map(|_| ledger.select_pattern(0, &mut history, &mut rng).unwrap())
            .collect();
        for pair in picks.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = PatternHistory::default();
        history.push(PatternKind::Grid);
        history.push(PatternKind::Wave);
        history.push(PatternKind::Pulse);
        history.push(PatternKind::Columns);
        assert_eq!(history.len(), 3);
        assert!(!history.contains(PatternKind::Grid));
        assert_eq!(history.last(), Some(PatternKind::Columns));
    }

    #[test]
    fn test_infinite_speed_multiplier_caps() {
        let mut t = tier(0, &[PatternKind::Grid]);
        assert_eq!(t.speed_multiplier(10), 1.0);
        t.infinite = Some(InfiniteScaling {
            speed_increment: 0.1,
            speed_cap: 1.5,
        });
        assert!((t.speed_multiplier(2) - 1.2).abs() < 1e-5);
        assert_eq!(t.speed_multiplier(50), 1.5);
    }

    proptest! {
        #[test]
        fn prop_no_repeat_within_three(seed in any::<u64>(), width in 4usize..8) {
            let kinds = &PatternKind::ALL[..width];
            let ledger = DifficultyLedger::new(vec![tier(0, kinds)]).unwrap();
            let mut history = PatternHistory::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let picks: Vec<_> = (0..30)
                .map(|_| ledger.select_pattern(0, &mut history, &mut rng).unwrap())
                .collect();
            for window in picks.windows(3) {
                prop_assert_ne!(window[0], window[1]);
                prop_assert_ne!(window[1], window[2]);
                prop_assert_ne!(window[0], window[2]);
            }
        }
    }
}
