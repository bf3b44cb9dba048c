//! Movement/layout patterns and their tuning
//!
//! [`PatternKind`] is the plain tag used in tier tables and history.
//! [`Pattern`] is the fully parameterized variant that layout and movement
//! match on. [`PatternCatalog`] turns a tag plus a tier speed into a pattern.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gravity::GravityParams;

/// Inclusive float range used throughout the tuning tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform sample; a reversed or collapsed span yields `min`
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    pub fn mid(&self) -> f32 {
        (self.min + self.max) / 2.0
    }
}

/// Pattern tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Grid,
    Columns,
    StaticRandom,
    SlowWander,
    FastWander,
    AlignedSweep,
    ColumnSweep,
    ConcentricCircles,
    ConcentricRotate,
    Pulse,
    Wave,
    WaveWrap,
    QuantumTeleport,
    GravityWells,
}

impl PatternKind {
    pub const ALL: [PatternKind; 14] = [
        PatternKind::Grid,
        PatternKind::Columns,
        PatternKind::StaticRandom,
        PatternKind::SlowWander,
        PatternKind::FastWander,
        PatternKind::AlignedSweep,
        PatternKind::ColumnSweep,
        PatternKind::ConcentricCircles,
        PatternKind::ConcentricRotate,
        PatternKind::Pulse,
        PatternKind::Wave,
        PatternKind::WaveWrap,
        PatternKind::QuantumTeleport,
        PatternKind::GravityWells,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Grid => "Grid",
            PatternKind::Columns => "Columns",
            PatternKind::StaticRandom => "StaticRandom",
            PatternKind::SlowWander => "SlowWander",
            PatternKind::FastWander => "FastWander",
            PatternKind::AlignedSweep => "AlignedSweep",
            PatternKind::ColumnSweep => "ColumnSweep",
            PatternKind::ConcentricCircles => "ConcentricCircles",
            PatternKind::ConcentricRotate => "ConcentricRotate",
            PatternKind::Pulse => "Pulse",
            PatternKind::Wave => "Wave",
            PatternKind::WaveWrap => "WaveWrap",
            PatternKind::QuantumTeleport => "QuantumTeleport",
            PatternKind::GravityWells => "GravityWells",
        }
    }

    /// Whether cards keep moving after the layout is revealed
    pub fn implies_motion(&self) -> bool {
        !matches!(
            self,
            PatternKind::Grid
                | PatternKind::Columns
                | PatternKind::StaticRandom
                | PatternKind::ConcentricCircles
        )
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pulse scale oscillation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseScale {
    pub scale: Span,
    /// Seconds per full oscillation
    pub period: f32,
    /// Upper bound of the random start delay per card
    pub max_delay: f32,
}

/// A pattern with everything layout and movement need
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Grid {
        spacing: Vec2,
    },
    Columns {
        columns: u32,
        spacing_y: f32,
    },
    StaticRandom,
    SlowWander {
        speed: f32,
    },
    FastWander {
        speed: f32,
    },
    /// Grid whose rows slide horizontally, alternating direction per row
    AlignedSweep {
        spacing: Vec2,
        speed: f32,
    },
    /// Grid whose columns slide vertically, alternating direction per column
    ColumnSweep {
        spacing: Vec2,
        speed: f32,
    },
    ConcentricCircles {
        ring_step: f32,
        footprint: f32,
    },
    ConcentricRotate {
        ring_step: f32,
        footprint: f32,
        /// Radians per second; odd rings spin the other way
        angular_speed: f32,
    },
    Pulse {
        speed: Span,
        pulse: PulseScale,
    },
    Wave {
        max_rows: u32,
        amplitude: f32,
        phase_step: f32,
        /// Radians per second
        frequency: f32,
    },
    WaveWrap {
        max_rows: u32,
        amplitude: f32,
        phase_step: f32,
        frequency: f32,
        /// Horizontal scroll speed
        speed: f32,
    },
    QuantumTeleport {
        /// Seconds between jumps
        interval: f32,
    },
    GravityWells(GravityParams),
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Grid { .. } => PatternKind::Grid,
            Pattern::Columns { .. } => PatternKind::Columns,
            Pattern::StaticRandom => PatternKind::StaticRandom,
            Pattern::SlowWander { .. } => PatternKind::SlowWander,
            Pattern::FastWander { .. } => PatternKind::FastWander,
            Pattern::AlignedSweep { .. } => PatternKind::AlignedSweep,
            Pattern::ColumnSweep { .. } => PatternKind::ColumnSweep,
            Pattern::ConcentricCircles { .. } => PatternKind::ConcentricCircles,
            Pattern::ConcentricRotate { .. } => PatternKind::ConcentricRotate,
            Pattern::Pulse { .. } => PatternKind::Pulse,
            Pattern::Wave { .. } => PatternKind::Wave,
            Pattern::WaveWrap { .. } => PatternKind::WaveWrap,
            Pattern::QuantumTeleport { .. } => PatternKind::QuantumTeleport,
            Pattern::GravityWells(_) => PatternKind::GravityWells,
        }
    }

    pub fn implies_motion(&self) -> bool {
        self.kind().implies_motion()
    }
}

/// Static per-pattern tuning table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Center-to-center spacing for grid layouts
    pub grid_spacing: Vec2,
    /// Column count for the Columns layout
    pub columns: u32,
    /// Preferred vertical spacing inside a column
    pub column_spacing_y: f32,
    /// Radius added per concentric ring
    pub ring_step: f32,
    /// Arc length one card needs on a ring
    pub ring_footprint: f32,
    pub wave_max_rows: u32,
    pub wave_amplitude: f32,
    /// Phase offset between neighbouring wave columns (radians)
    pub wave_phase_step: f32,
    /// Scroll speed for WaveWrap as a fraction of the tier speed
    pub wave_wrap_scroll: f32,
    pub pulse: PulseScale,
    /// Spread of per-card wander speed around the tier speed
    pub pulse_speed_spread: f32,
    pub gravity: GravityParams,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            grid_spacing: Vec2::new(100.0, 130.0),
            columns: 4,
            column_spacing_y: 130.0,
            ring_step: 120.0,
            ring_footprint: 95.0,
            wave_max_rows: 4,
            wave_amplitude: 28.0,
            wave_phase_step: 0.55,
            wave_wrap_scroll: 40.0,
            pulse: PulseScale {
                scale: Span::new(0.75, 1.2),
                period: 1.6,
                max_delay: 1.5,
            },
            pulse_speed_spread: 0.3,
            gravity: GravityParams::default(),
        }
    }
}

/// Builds parameterized patterns from tags
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    params: PatternParams,
}

impl PatternCatalog {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    /// Build a pattern, interpreting `speed` in the pattern's own unit
    /// (pixels/s for wander and sweeps, radians/s for rotation and waves,
    /// jumps/s for teleport, force ceiling for gravity wells)
    pub fn build(&self, kind: PatternKind, speed: f32) -> Pattern {
        let p = &self.params;
        let speed = speed.max(0.0);
        match kind {
            PatternKind::Grid => Pattern::Grid {
                spacing: p.grid_spacing,
            },
            PatternKind::Columns => Pattern::Columns {
                columns: p.columns.max(1),
                spacing_y: p.column_spacing_y,
            },
            PatternKind::StaticRandom => Pattern::StaticRandom,
            PatternKind::SlowWander => Pattern::SlowWander { speed },
            PatternKind::FastWander => Pattern::FastWander { speed },
            PatternKind::AlignedSweep => Pattern::AlignedSweep {
                spacing: p.grid_spacing,
                speed,
            },
            PatternKind::ColumnSweep => Pattern::ColumnSweep {
                spacing: p.grid_spacing,
                speed,
            },
            PatternKind::ConcentricCircles => Pattern::ConcentricCircles {
                ring_step: p.ring_step,
                footprint: p.ring_footprint,
            },
            PatternKind::ConcentricRotate => Pattern::ConcentricRotate {
                ring_step: p.ring_step,
                footprint: p.ring_footprint,
                angular_speed: speed,
            },
            PatternKind::Pulse => Pattern::Pulse {
                speed: Span::new(
                    speed * (1.0 - p.pulse_speed_spread),
                    speed * (1.0 + p.pulse_speed_spread),
                ),
                pulse: p.pulse,
            },
            PatternKind::Wave => Pattern::Wave {
                max_rows: p.wave_max_rows.max(1),
                amplitude: p.wave_amplitude,
                phase_step: p.wave_phase_step,
                frequency: speed,
            },
            PatternKind::WaveWrap => Pattern::WaveWrap {
                max_rows: p.wave_max_rows.max(1),
                amplitude: p.wave_amplitude,
                phase_step: p.wave_phase_step,
                frequency: speed,
                speed: p.wave_wrap_scroll * speed,
            },
            PatternKind::QuantumTeleport => Pattern::QuantumTeleport {
                interval: if speed > 0.0 { 1.0 / speed } else { f32::INFINITY },
            },
            PatternKind::GravityWells => Pattern::GravityWells(GravityParams {
                max_force: if speed > 0.0 { speed } else { p.gravity.max_force },
                ..p.gravity
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_round_trips_kind() {
        let catalog = PatternCatalog::default();
        for kind in PatternKind::ALL {
            assert_eq!(catalog.build(kind, 50.0).kind(), kind);
        }
    }

    #[test]
    fn test_static_patterns_have_no_motion() {
        assert!(!PatternKind::Grid.implies_motion());
        assert!(!PatternKind::Columns.implies_motion());
        assert!(!PatternKind::StaticRandom.implies_motion());
        assert!(!PatternKind::ConcentricCircles.implies_motion());
        assert!(PatternKind::GravityWells.implies_motion());
        assert!(PatternKind::QuantumTeleport.implies_motion());
    }

    #[test]
    fn test_teleport_interval_from_speed() {
        let catalog = PatternCatalog::default();
        match catalog.build(PatternKind::QuantumTeleport, 0.5) {
            Pattern::QuantumTeleport { interval } => assert!((interval - 2.0).abs() < 1e-5),
            other => panic!("unexpected pattern {:?}", other),
        }
        match catalog.build(PatternKind::QuantumTeleport, 0.0) {
            Pattern::QuantumTeleport { interval } => assert!(interval.is_infinite()),
            other => panic!("unexpected pattern {:?}", other),
        }
    }

    #[test]
    fn test_gravity_speed_sets_force_ceiling() {
        let catalog = PatternCatalog::default();
        match catalog.build(PatternKind::GravityWells, 75.0) {
            Pattern::GravityWells(params) => assert_eq!(params.max_force, 75.0),
            other => panic!("unexpected pattern {:?}", other),
        }
    }

    #[test]
    fn test_span_sample_collapsed() {
        use rand::SeedableRng;
        let mut rng = rand_pcg::Pcg32::seed_from_u64(4);
        assert_eq!(Span::new(3.0, 3.0).sample(&mut rng), 3.0);
        assert_eq!(Span::new(5.0, 1.0).sample(&mut rng), 5.0);
        let v = Span::new(1.0, 2.0).sample(&mut rng);
        assert!((1.0..=2.0).contains(&v));
    }
}
