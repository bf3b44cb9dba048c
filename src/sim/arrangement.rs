//! Round-level orchestration of cards, layouts and movement
//!
//! ```text
//! Idle --round start--> Populating --> Settling --entry done--> Active
//!                            ^                                    |
//!                            +---- Transitioning <--advance-------+
//! any --round over--> RoundOver
//! ```
//!
//! Populating and Transitioning only last for the duration of one call. A
//! re-entrancy flag keeps a second advance from starting while the previous
//! one is still waiting for its reveal to finish.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::card::{Card, CardId, CardView};
use super::difficulty::{DifficultyLedger, PatternHistory};
use super::layout::{Layout, LayoutEngine};
use super::movement::{MotionEnv, MovementScheduler};
use super::pattern::{Pattern, PatternCatalog, PatternKind};
use super::placement::PositionValidator;
use super::region::{Region, coverage};
use crate::error::ArrangeError;
use crate::settings::Settings;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrangementPhase {
    /// No round yet
    Idle,
    /// Choosing tier and pattern, laying out cards
    Populating,
    /// Cards placed, waiting for the presentation layer's entry animation
    Settling,
    /// Pattern running (or static)
    Active,
    /// Tearing down the previous pattern after a match
    Transitioning,
    /// Round ended; only a new round start leaves this
    RoundOver,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum ArrangementEvent {
    /// A new wanted card was finalized
    WantedSelected(CardId),
    /// Motion (or a static layout) went live
    PatternStarted { kind: PatternKind, cards: usize },
    TierChanged { from: usize, to: usize },
    /// Some placements missed the minimum distance or ring density cap
    PlacementDegraded { count: usize },
    /// Zero or several wanted flags were found and fixed
    WantedRepaired { survivor: CardId, flagged: usize },
    /// The wanted card was mostly hidden and got nudged
    VisibilityNudged { card: CardId, coverage: f32 },
}

/// Pattern currently on the table
#[derive(Debug, Clone)]
struct Arrangement {
    pattern: Pattern,
    layout: Layout,
    /// Tier whose speed the running motion uses
    speed_tier: usize,
}

/// Orchestrates one player's card table
pub struct ArrangementController {
    settings: Settings,
    ledger: DifficultyLedger,
    catalog: PatternCatalog,
    engine: LayoutEngine,
    scheduler: MovementScheduler,
    history: PatternHistory,
    rng: Pcg32,

    cards: Vec<Card>,
    phase: ArrangementPhase,
    arrangement: Option<Arrangement>,
    score: u64,
    tier_index: usize,
    rounds_in_tier: u32,
    /// Re-entrancy guard for advance transitions
    transitioning: bool,
    /// Wanted card as last handed to the presentation layer
    wanted_ref: Option<CardId>,
    visibility_timer: f32,
    events: Vec<ArrangementEvent>,
    next_id: u32,
}

impl ArrangementController {
    /// Validate settings and build a controller with its own seeded rng
    pub fn new(settings: Settings, seed: u64) -> Result<Self, ArrangeError> {
        let ledger = settings.validate()?;
        let validator = PositionValidator::new(settings.retry_budget);
        let engine = LayoutEngine::new(settings.card_size, settings.min_distance, validator);
        let catalog = PatternCatalog::new(settings.patterns.clone());

        Ok(Self {
            settings,
            ledger,
            catalog,
            engine,
            scheduler: MovementScheduler::new(),
            history: PatternHistory::default(),
            rng: Pcg32::seed_from_u64(seed),
            cards: Vec::new(),
            phase: ArrangementPhase::Idle,
            arrangement: None,
            score: 0,
            tier_index: 0,
            rounds_in_tier: 0,
            transitioning: false,
            wanted_ref: None,
            visibility_timer: 0.0,
            events: Vec::new(),
            next_id: 1,
        })
    }

    pub fn phase(&self) -> ArrangementPhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn tier_index(&self) -> usize {
        self.tier_index
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &PatternHistory {
        &self.history
    }

    pub fn scheduler(&self) -> &MovementScheduler {
        &self.scheduler
    }

    pub fn current_pattern(&self) -> Option<&Pattern> {
        self.arrangement.as_ref().map(|a| &a.pattern)
    }

    pub fn current_region(&self) -> Option<Region> {
        self.arrangement.as_ref().map(|a| a.layout.bounds)
    }

    /// Currently wanted card, if exactly one is flagged
    pub fn wanted(&self) -> Option<CardId> {
        let mut flagged = self.cards.iter().filter(|c| c.active && c.wanted);
        match (flagged.next(), flagged.next()) {
            (Some(card), None) => Some(card.id),
            _ => None,
        }
    }

    /// Snapshot of every card for rendering and hit testing
    pub fn current_entities(&self) -> Vec<CardView> {
        self.cards.iter().map(Card::view).collect()
    }

    pub fn drain_events(&mut self) -> Vec<ArrangementEvent> {
        std::mem::take(&mut self.events)
    }

    /// Presentation layer's idea of the wanted card; may go stale
    pub fn set_wanted_reference(&mut self, id: Option<CardId>) {
        self.wanted_ref = id;
    }

    /// Start a round: pick tier and pattern, lay out, flag one wanted card
    pub fn on_round_start(&mut self) -> Result<(), ArrangeError> {
        self.scheduler.cancel_all();
        self.transitioning = false;
        if let Err(err) = self.populate() {
            log::error!("round start aborted: {}", err);
            self.phase = ArrangementPhase::Idle;
            return Err(err);
        }
        Ok(())
    }

    /// Score update from the round owner
    ///
    /// Crossing into another tier while a pattern runs restarts its motion at
    /// the new tier's speed, unless an incorrect selection is being handled
    /// this cycle. The pattern itself only changes on the next advance.
    pub fn on_score_changed(&mut self, score: u64) {
        self.score = score;
        let (tier, _) = self.ledger.select_tier(score);

        if self.phase != ArrangementPhase::Active || self.transitioning {
            return;
        }
        let Some(arrangement) = self.arrangement.as_ref() else {
            return;
        };
        if tier == arrangement.speed_tier || !arrangement.pattern.implies_motion() {
            return;
        }

        let kind = arrangement.pattern.kind();
        let rounds = if tier == self.tier_index {
            self.rounds_in_tier
        } else {
            0
        };
        let Some(speed) = self.speed_for(tier, kind, rounds) else {
            log::debug!("{} not offered by tier {}; keeping current speed", kind, tier);
            return;
        };
        if !self.scheduler.request_cancel() {
            return;
        }

        log::info!("score {} moved speed to tier {} ({})", score, tier, kind);
        let pattern = self.catalog.build(kind, speed);
        if let Some(arrangement) = self.arrangement.as_mut() {
            arrangement.pattern = pattern;
            arrangement.speed_tier = tier;
        }
        self.start_motion();
    }

    /// An incorrect card was picked; keep motion undisturbed this cycle
    pub fn on_wrong_selection(&mut self, id: CardId) {
        if self.cards.iter().any(|c| c.id == id && c.active) {
            self.scheduler.suppress_cancel_for_cycle();
        } else {
            log::debug!("wrong selection on unknown card {}", id);
        }
    }

    /// A match happened: tear down motion and lay out the next arrangement
    pub fn on_advance_wanted(&mut self) -> Result<(), ArrangeError> {
        if self.transitioning {
            log::debug!("advance ignored: transition already in progress");
            return Ok(());
        }
        if matches!(self.phase, ArrangementPhase::Idle | ArrangementPhase::RoundOver) {
            log::debug!("advance ignored in {:?}", self.phase);
            return Ok(());
        }

        self.transitioning = true;
        self.phase = ArrangementPhase::Transitioning;
        self.scheduler.cancel_all();

        if let Err(err) = self.populate() {
            log::error!("advance aborted: {}", err);
            self.transitioning = false;
            self.phase = ArrangementPhase::Idle;
            return Err(err);
        }
        Ok(())
    }

    /// Entry/reveal animation finished; go live
    pub fn notify_entry_animation_complete(&mut self) {
        if self.phase != ArrangementPhase::Settling {
            log::debug!("entry completion ignored in {:?}", self.phase);
            return;
        }
        for card in self.cards.iter_mut().filter(|c| c.active) {
            card.scale = 1.0;
        }
        self.phase = ArrangementPhase::Active;
        self.transitioning = false;
        self.visibility_timer = 0.0;
        self.start_motion();
        self.ensure_single_wanted();
    }

    pub fn on_round_over(&mut self) {
        self.scheduler.cancel_all();
        self.transitioning = false;
        self.phase = ArrangementPhase::RoundOver;
        log::info!("round over at score {}", self.score);
    }

    /// Advance motion and the periodic visibility check by one step
    pub fn tick(&mut self, dt: f32) {
        if self.phase != ArrangementPhase::Active {
            return;
        }
        let Some(env) = self.motion_env() else {
            return;
        };
        self.scheduler.tick(&mut self.cards, dt, &env, &mut self.rng);

        self.visibility_timer += dt;
        if self.visibility_timer >= self.settings.visibility_interval {
            self.visibility_timer = 0.0;
            self.check_visibility();
        }
        self.ensure_single_wanted();
    }

    /// Make exactly one active card wanted
    ///
    /// Survivor preference: the external reference if it still names an
    /// active card, then the first flagged card, then the first active card.
    pub fn ensure_single_wanted(&mut self) {
        let flagged: Vec<CardId> = self
            .cards
            .iter()
            .filter(|c| c.active && c.wanted)
            .map(|c| c.id)
            .collect();
        // Inactive cards never keep the flag
        for card in self.cards.iter_mut().filter(|c| !c.active) {
            card.wanted = false;
        }

        if flagged.len() == 1 {
            self.wanted_ref = Some(flagged[0]);
            return;
        }

        let live_ref = self
            .wanted_ref
            .filter(|id| self.cards.iter().any(|c| c.id == *id && c.active));
        if let (Some(stale), None) = (self.wanted_ref, live_ref) {
            log::warn!("wanted reference {} is stale", stale);
        }

        let survivor = live_ref
            .or_else(|| flagged.first().copied())
            .or_else(|| self.cards.iter().find(|c| c.active).map(|c| c.id));
        let Some(survivor) = survivor else {
            return;
        };

        log::warn!(
            "{} wanted cards flagged; keeping {}",
            flagged.len(),
            survivor
        );
        for card in &mut self.cards {
            card.wanted = card.id == survivor;
        }
        self.wanted_ref = Some(survivor);
        self.events.push(ArrangementEvent::WantedRepaired {
            survivor,
            flagged: flagged.len(),
        });
    }

    fn populate(&mut self) -> Result<(), ArrangeError> {
        self.phase = ArrangementPhase::Populating;

        let (tier, _) = self.ledger.select_tier(self.score);
        if tier != self.tier_index {
            log::info!("difficulty tier {} -> {}", self.tier_index, tier);
            self.events.push(ArrangementEvent::TierChanged {
                from: self.tier_index,
                to: tier,
            });
            self.tier_index = tier;
            self.rounds_in_tier = 0;
            self.history.clear();
        }

        let kind = self
            .ledger
            .select_pattern(tier, &mut self.history, &mut self.rng)?;
        let rule = *self
            .ledger
            .tier(tier)
            .and_then(|t| t.rule(kind))
            .ok_or(ArrangeError::EmptyPatternSet { tier })?;
        let speed = self
            .speed_for(tier, kind, self.rounds_in_tier)
            .unwrap_or(rule.speed);

        let count = rule.sample_count(&mut self.rng);
        let pattern = self.catalog.build(kind, speed);
        let region = self.settings.region_for(kind);
        let layout = self.engine.compute(&pattern, count, &region, &mut self.rng);
        if layout.degraded > 0 {
            self.events.push(ArrangementEvent::PlacementDegraded {
                count: layout.degraded,
            });
        }

        self.place_cards(&layout);
        self.assign_faces();
        if self.settings.only_one_color {
            self.apply_one_color_filter();
        }
        self.ensure_single_wanted();

        log::info!(
            "tier {} round {}: {} with {} cards (speed {:.2})",
            tier,
            self.rounds_in_tier,
            kind,
            count,
            speed
        );
        self.rounds_in_tier += 1;
        self.arrangement = Some(Arrangement {
            pattern,
            layout,
            speed_tier: tier,
        });

        if let Some(wanted) = self.wanted() {
            self.events.push(ArrangementEvent::WantedSelected(wanted));
        }
        self.phase = ArrangementPhase::Settling;
        Ok(())
    }

    /// Rule speed for `kind` in `tier`, scaled by infinite difficulty
    fn speed_for(&self, tier: usize, kind: PatternKind, rounds: u32) -> Option<f32> {
        let tier = self.ledger.tier(tier)?;
        let rule = tier.rule(kind)?;
        Some(rule.speed * tier.speed_multiplier(rounds))
    }

    /// Reuse existing cards in slot order, create missing ones, drop extras
    fn place_cards(&mut self, layout: &Layout) {
        let needed = layout.slots.len();
        while self.cards.len() < needed {
            let id = CardId(self.next_id);
            self.next_id += 1;
            self.cards.push(Card::new(id));
        }
        self.cards.truncate(needed);

        for (card, slot) in self.cards.iter_mut().zip(&layout.slots) {
            card.pos = slot.pos;
            card.scale = 0.0;
            card.active = true;
            card.wanted = false;
        }
    }

    /// Pick the wanted card and give everyone else a different face
    fn assign_faces(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let faces = self.settings.face_count.max(2);
        let tints = self.settings.tint_count.max(1);
        let wanted_index = self.rng.random_range(0..self.cards.len());
        let wanted_face = self.rng.random_range(0..faces);

        for (i, card) in self.cards.iter_mut().enumerate() {
            card.tint = self.rng.random_range(0..tints);
            if i == wanted_index {
                card.face = wanted_face;
                card.wanted = true;
            } else {
                let face = self.rng.random_range(0..faces - 1);
                card.face = if face >= wanted_face { face + 1 } else { face };
            }
        }
        self.wanted_ref = Some(self.cards[wanted_index].id);
    }

    /// Leave the wanted card as the only one of its tint
    fn apply_one_color_filter(&mut self) {
        let Some(tint) = self.cards.iter().find(|c| c.wanted).map(|c| c.tint) else {
            return;
        };
        let mut hidden = 0;
        for card in self.cards.iter_mut().filter(|c| !c.wanted && c.tint == tint) {
            card.active = false;
            hidden += 1;
        }
        log::debug!("one-color filter deactivated {} cards", hidden);
    }

    fn motion_env(&self) -> Option<MotionEnv> {
        let arrangement = self.arrangement.as_ref()?;
        Some(MotionEnv {
            bounds: arrangement.layout.bounds,
            validator: self.engine.validator,
            min_distance: self.settings.min_distance,
        })
    }

    fn start_motion(&mut self) {
        let Some(arrangement) = self.arrangement.as_ref() else {
            return;
        };
        let started = self.scheduler.start_pattern(
            &arrangement.pattern,
            &self.cards,
            &arrangement.layout,
            self.settings.card_size,
            &mut self.rng,
        );
        self.events.push(ArrangementEvent::PatternStarted {
            kind: arrangement.pattern.kind(),
            cards: started,
        });
    }

    /// Nudge the wanted card when other cards cover most of it
    fn check_visibility(&mut self) {
        let Some(wanted_index) = self.cards.iter().position(|c| c.active && c.wanted) else {
            return;
        };
        let Some(bounds) = self.current_region() else {
            return;
        };
        let size = self.settings.card_size;
        let wanted = &self.cards[wanted_index];
        let target = wanted.full_rect(size);
        let covered = coverage(
            &target,
            self.cards
                .iter()
                .filter(|c| c.active && c.id != wanted.id)
                .map(|c| c.rect(size)),
        );
        if covered < self.settings.occlusion_threshold {
            return;
        }

        let nudge = self.settings.visibility_nudge.max(0.0);
        let offset = Vec2::new(
            self.rng.random_range(-nudge..=nudge),
            self.rng.random_range(-nudge..=nudge),
        );
        let card = &mut self.cards[wanted_index];
        card.pos = bounds.clamp(card.pos + offset);
        log::debug!("wanted card {} {:.0}% covered, nudged", card.id, covered * 100.0);
        self.events.push(ArrangementEvent::VisibilityNudged {
            card: card.id,
            coverage: covered,
        });
    }
}
