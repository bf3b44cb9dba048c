//! Card Arrange - placement and movement engine for a find-the-wanted-card game
//!
//! Core modules:
//! - `sim`: Deterministic arrangement (layouts, movement, difficulty, round flow)
//! - `settings`: Difficulty tiers and pattern tuning tables
//! - `error`: Configuration error taxonomy

pub mod error;
pub mod settings;
pub mod sim;

pub use error::ArrangeError;
pub use settings::Settings;

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz is plenty for card motion)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default card footprint (width, height)
    pub const CARD_WIDTH: f32 = 80.0;
    pub const CARD_HEIGHT: f32 = 110.0;

    /// Samples tried before a placement is accepted as-is
    pub const PLACEMENT_RETRY_BUDGET: u32 = 50;

    /// Recently used patterns remembered for anti-repeat selection
    pub const PATTERN_HISTORY_LEN: usize = 3;

    /// Concentric rings never reach past this fraction of the smaller region side
    pub const RING_RADIUS_LIMIT: f32 = 0.45;

    /// Gravity wells alive at once
    pub const MAX_GRAVITY_SOURCES: usize = 5;

    /// Wanted card counts as hidden once this share of it is covered
    pub const OCCLUSION_THRESHOLD: f32 = 0.9;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Ease-in-out curve used by tweened motion
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
