//! Gravity well field for the GravityWells pattern
//!
//! Sources are short-lived points that pull (positive strength) or push
//! (negative strength) cards within their radius. The simulator is created
//! when the pattern starts and dropped when its movement is cancelled, so no
//! source outlives the pattern.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::pattern::Span;
use super::placement::PositionValidator;
use super::region::Region;
use crate::consts::MAX_GRAVITY_SOURCES;

/// Lifetime left below this counts as spent; absorbs f32 drift from summing ticks
const EXPIRY_EPSILON: f32 = 1e-4;

/// Field tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityParams {
    pub max_sources: usize,
    /// Sources placed when the field starts
    pub initial_sources: usize,
    /// Seconds a source lives
    pub lifetime: Span,
    /// Strength magnitude; sign is picked per source
    pub strength: Span,
    /// Chance that a new source repels instead of attracting
    pub repel_chance: f32,
    pub radius: Span,
    /// Expected spawns per second while under the cap
    pub spawn_rate: f32,
    /// Chance an expired source is replaced right away
    pub respawn_chance: f32,
    /// Ceiling on the summed force magnitude
    pub max_force: f32,
    /// Minimum distance between sources
    pub min_source_distance: f32,
}

impl Default for GravityParams {
    fn default() -> Self {
        Self {
            max_sources: MAX_GRAVITY_SOURCES,
            initial_sources: 2,
            lifetime: Span::new(2.5, 5.0),
            strength: Span::new(60.0, 140.0),
            repel_chance: 0.35,
            radius: Span::new(160.0, 280.0),
            spawn_rate: 0.6,
            respawn_chance: 0.7,
            max_force: 120.0,
            min_source_distance: 180.0,
        }
    }
}

/// A transient attractor or repeller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravitySource {
    pub id: u32,
    pub pos: Vec2,
    /// Positive attracts, negative repels
    pub strength: f32,
    /// Seconds left
    pub lifetime: f32,
    pub radius: f32,
}

impl GravitySource {
    pub fn is_expired(&self) -> bool {
        self.lifetime <= EXPIRY_EPSILON
    }

    /// Force this source exerts at `pos` (zero outside the radius)
    pub fn force_at(&self, pos: Vec2) -> Vec2 {
        if self.radius <= 0.0 {
            return Vec2::ZERO;
        }
        let delta = self.pos - pos;
        let distance = delta.length();
        if distance >= self.radius {
            return Vec2::ZERO;
        }
        let falloff = 1.0 - distance / self.radius;
        delta.normalize_or_zero() * self.strength * falloff
    }
}

/// Spawns, expires and applies gravity sources
#[derive(Debug, Clone)]
pub struct GravityFieldSimulator {
    params: GravityParams,
    region: Region,
    validator: PositionValidator,
    sources: Vec<GravitySource>,
    next_id: u32,
}

impl GravityFieldSimulator {
    pub fn new(params: GravityParams, region: Region) -> Self {
        Self {
            params,
            region,
            validator: PositionValidator::default(),
            sources: Vec::with_capacity(params.max_sources.min(MAX_GRAVITY_SOURCES)),
            next_id: 1,
        }
    }

    /// Field with the configured number of starting sources
    pub fn seeded(params: GravityParams, region: Region, rng: &mut impl Rng) -> Self {
        let mut field = Self::new(params, region);
        for _ in 0..params.initial_sources.min(field.cap()) {
            field.spawn(rng);
        }
        field
    }

    /// Field starting from explicit sources (trimmed to the cap)
    pub fn with_sources(
        params: GravityParams,
        region: Region,
        mut sources: Vec<GravitySource>,
    ) -> Self {
        let mut field = Self::new(params, region);
        sources.truncate(field.cap());
        field.next_id = sources.iter().map(|s| s.id + 1).max().unwrap_or(1);
        field.sources = sources;
        field
    }

    pub fn params(&self) -> &GravityParams {
        &self.params
    }

    pub fn sources(&self) -> &[GravitySource] {
        &self.sources
    }

    /// Effective source cap
    pub fn cap(&self) -> usize {
        self.params.max_sources.min(MAX_GRAVITY_SOURCES)
    }

    /// Advance lifetimes, expire and spawn sources
    pub fn step(&mut self, dt: f32, rng: &mut impl Rng) {
        for source in &mut self.sources {
            source.lifetime -= dt;
        }

        let before = self.sources.len();
        self.sources.retain(|s| !s.is_expired());
        let expired = before - self.sources.len();

        for _ in 0..expired {
            let respawn = self.params.respawn_chance.clamp(0.0, 1.0) as f64;
            if self.sources.len() < self.cap() && rng.random_bool(respawn) {
                self.spawn(rng);
            }
        }

        let spawn_chance = (self.params.spawn_rate * dt).clamp(0.0, 1.0);
        if self.sources.len() < self.cap() && rng.random_bool(spawn_chance as f64) {
            self.spawn(rng);
        }
    }

    /// Summed force at `pos`, clamped to the ceiling
    pub fn force_at(&self, pos: Vec2) -> Vec2 {
        let total: Vec2 = self.sources.iter().map(|s| s.force_at(pos)).sum();
        total.clamp_length_max(self.params.max_force.max(0.0))
    }

    /// Position after one tick of drift, kept inside the region
    pub fn displace(&self, pos: Vec2, dt: f32) -> Vec2 {
        self.region.clamp(pos + self.force_at(pos) * dt)
    }

    fn spawn(&mut self, rng: &mut impl Rng) {
        if self.sources.len() >= self.cap() {
            return;
        }
        let existing: Vec<Vec2> = self.sources.iter().map(|s| s.pos).collect();
        let placement =
            self.validator
                .propose(&self.region, &existing, self.params.min_source_distance, rng);
        if placement.degraded {
            log::debug!("gravity source placed without clearance");
        }

        let magnitude = self.params.strength.sample(rng);
        let strength = if rng.random_bool(self.params.repel_chance.clamp(0.0, 1.0) as f64) {
            -magnitude
        } else {
            magnitude
        };

        let source = GravitySource {
            id: self.next_id,
            pos: placement.pos,
            strength,
            lifetime: self.params.lifetime.sample(rng),
            radius: self.params.radius.sample(rng),
        };
        self.next_id += 1;
        self.sources.push(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn source(id: u32, pos: Vec2, strength: f32) -> GravitySource {
        GravitySource {
            id,
            pos,
            strength,
            lifetime: 3.0,
            radius: 100.0,
        }
    }

    #[test]
    fn test_initial_sources_expire() {
        let mut rng = Pcg32::seed_from_u64(11);
        let region = Region::new(800.0, 600.0);
        let mut field = GravityFieldSimulator::with_sources(
            GravityParams::default(),
            region,
            vec![
                source(1, Vec2::new(-200.0, 0.0), 80.0),
                source(2, Vec2::new(200.0, 0.0), -80.0),
            ],
        );

        for _ in 0..60 {
            field.step(0.05, &mut rng);
            assert!(field.sources().len() <= 5);
        }

        assert!(field.sources().iter().all(|s| s.id > 2));
        assert!(field.sources().len() <= 5);
    }

    #[test]
    fn test_lifetime_spent_after_exact_tick_count() {
        let mut rng = Pcg32::seed_from_u64(21);
        let params = GravityParams {
            spawn_rate: 0.0,
            respawn_chance: 0.0,
            ..GravityParams::default()
        };
        let mut field = GravityFieldSimulator::with_sources(
            params,
            Region::new(800.0, 600.0),
            vec![
                source(1, Vec2::new(-200.0, 0.0), 80.0),
                source(2, Vec2::new(200.0, 0.0), -80.0),
            ],
        );

        for _ in 0..59 {
            field.step(0.05, &mut rng);
        }
        assert_eq!(field.sources().len(), 2);

        field.step(0.05, &mut rng);
        assert!(field.sources().is_empty());
    }

    #[test]
    fn test_cap_holds_under_aggressive_spawning() {
        let mut rng = Pcg32::seed_from_u64(12);
        let params = GravityParams {
            spawn_rate: 1000.0,
            respawn_chance: 1.0,
            max_sources: 50,
            ..GravityParams::default()
        };
        let mut field = GravityFieldSimulator::new(params, Region::new(1000.0, 1000.0));
        for _ in 0..200 {
            field.step(0.05, &mut rng);
            assert!(field.sources().len() <= MAX_GRAVITY_SOURCES);
        }
        assert_eq!(field.sources().len(), MAX_GRAVITY_SOURCES);
    }

    #[test]
    fn test_attract_and_repel_directions() {
        let attract = source(1, Vec2::new(50.0, 0.0), 100.0);
        let repel = source(2, Vec2::new(50.0, 0.0), -100.0);
        assert!(attract.force_at(Vec2::ZERO).x > 0.0);
        assert!(repel.force_at(Vec2::ZERO).x < 0.0);
        // Linear falloff: halfway out gives half strength
        assert!((attract.force_at(Vec2::ZERO).x - 50.0).abs() < 1e-3);
        // Outside radius
        assert_eq!(attract.force_at(Vec2::new(-100.0, 0.0)), Vec2::ZERO);
    }

    #[test]
    fn test_force_is_clamped_and_position_stays_inside() {
        let params = GravityParams {
            max_force: 30.0,
            ..GravityParams::default()
        };
        let region = Region::new(100.0, 100.0);
        let sources = (1..=5)
            .map(|id| source(id, Vec2::new(49.0, 0.0), 1000.0))
            .collect();
        let field = GravityFieldSimulator::with_sources(params, region, sources);

        let force = field.force_at(Vec2::ZERO);
        assert!(force.length() <= 30.0 + 1e-3);

        let mut pos = Vec2::new(45.0, 0.0);
        for _ in 0..100 {
            pos = field.displace(pos, 0.1);
            assert!(region.contains(pos));
        }
    }

    #[test]
    fn test_seeded_sources_keep_distance() {
        let mut rng = Pcg32::seed_from_u64(13);
        let field = GravityFieldSimulator::seeded(
            GravityParams {
                initial_sources: 3,
                ..GravityParams::default()
            },
            Region::new(1200.0, 900.0),
            &mut rng,
        );
        let sources = field.sources();
        assert_eq!(sources.len(), 3);
        for (i, a) in sources.iter().enumerate() {
            for b in &sources[i + 1..] {
                assert!(a.pos.distance(b.pos) >= 180.0);
            }
        }
    }
}
