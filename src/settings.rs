//! Arrangement settings
//!
//! Static configuration: table size, card footprint, pattern tuning and the
//! difficulty progression. Built-in defaults are playable as-is; a JSON file
//! can override any subset of fields.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CARD_HEIGHT, CARD_WIDTH, OCCLUSION_THRESHOLD, PLACEMENT_RETRY_BUDGET};
use crate::error::ArrangeError;
use crate::sim::difficulty::{DifficultyLedger, DifficultyTier, InfiniteScaling, PatternRule};
use crate::sim::pattern::{PatternKind, PatternParams};
use crate::sim::region::Region;

/// Fixed table size for a pattern, regardless of the device region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOverride {
    pub pattern: PatternKind,
    pub width: f32,
    pub height: f32,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Playable table size
    pub region: Region,
    /// Card footprint at scale 1
    pub card_size: Vec2,
    /// Minimum center distance for scattered placements
    pub min_distance: f32,
    /// Samples per placement before accepting a crowded spot
    pub retry_budget: u32,

    // === Visibility ===
    /// Seconds between wanted-card occlusion checks
    pub visibility_interval: f32,
    /// Covered share at which the wanted card gets nudged
    pub occlusion_threshold: f32,
    /// Largest nudge per axis
    pub visibility_nudge: f32,

    // === Card faces ===
    /// Distinct characters available
    pub face_count: u16,
    /// Color variants per character
    pub tint_count: u8,
    /// Deactivate non-wanted cards sharing the wanted card's tint
    pub only_one_color: bool,

    // === Patterns ===
    pub patterns: PatternParams,
    pub region_overrides: Vec<RegionOverride>,

    // === Progression ===
    pub tiers: Vec<DifficultyTier>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: Region::new(1080.0, 1500.0),
            card_size: Vec2::new(CARD_WIDTH, CARD_HEIGHT),
            min_distance: 95.0,
            retry_budget: PLACEMENT_RETRY_BUDGET,

            visibility_interval: 0.5,
            occlusion_threshold: OCCLUSION_THRESHOLD,
            visibility_nudge: 40.0,

            face_count: 4,
            tint_count: 3,
            only_one_color: false,

            patterns: PatternParams::default(),
            region_overrides: vec![
                RegionOverride {
                    pattern: PatternKind::ConcentricCircles,
                    width: 1000.0,
                    height: 1000.0,
                },
                RegionOverride {
                    pattern: PatternKind::ConcentricRotate,
                    width: 1000.0,
                    height: 1000.0,
                },
            ],

            tiers: default_tiers(),
        }
    }
}

fn default_tiers() -> Vec<DifficultyTier> {
    use PatternKind::*;

    let tier = |threshold: u64, patterns: Vec<PatternRule>| DifficultyTier {
        threshold,
        patterns,
        infinite: None,
    };

    vec![
        tier(
            0,
            vec![
                PatternRule::new(Grid, 6, 10, 0.0),
                PatternRule::new(Columns, 6, 14, 0.0),
                PatternRule::new(StaticRandom, 8, 12, 0.0),
            ],
        ),
        tier(
            5,
            vec![
                PatternRule::new(SlowWander, 8, 14, 60.0),
                PatternRule::new(AlignedSweep, 10, 16, 70.0),
                PatternRule::new(ConcentricCircles, 10, 18, 0.0),
                PatternRule::new(Columns, 10, 16, 0.0),
            ],
        ),
        tier(
            12,
            vec![
                PatternRule::new(FastWander, 10, 16, 140.0),
                PatternRule::new(ColumnSweep, 12, 18, 90.0),
                PatternRule::new(ConcentricRotate, 12, 20, 0.5),
                PatternRule::new(Pulse, 10, 16, 70.0),
                PatternRule::new(Wave, 12, 20, 2.0),
            ],
        ),
        tier(
            20,
            vec![
                PatternRule::new(WaveWrap, 14, 22, 2.2),
                PatternRule::new(QuantumTeleport, 10, 16, 0.6),
                PatternRule::new(GravityWells, 12, 18, 110.0),
                PatternRule::new(FastWander, 14, 20, 170.0),
                PatternRule::new(ConcentricRotate, 16, 24, 0.8),
            ],
        ),
        tier(
            30,
            vec![
                PatternRule::new(AlignedSweep, 18, 26, 130.0),
                PatternRule::new(ColumnSweep, 18, 26, 130.0),
                PatternRule::new(Pulse, 16, 24, 110.0),
                PatternRule::new(QuantumTeleport, 16, 22, 0.9),
                PatternRule::new(GravityWells, 16, 24, 150.0),
                PatternRule::new(WaveWrap, 18, 28, 2.8),
            ],
        ),
        DifficultyTier {
            threshold: 45,
            patterns: vec![
                PatternRule::new(FastWander, 20, 30, 200.0),
                PatternRule::new(ConcentricRotate, 20, 30, 1.0),
                PatternRule::new(QuantumTeleport, 20, 28, 1.1),
                PatternRule::new(GravityWells, 20, 28, 180.0),
                PatternRule::new(WaveWrap, 22, 32, 3.2),
            ],
            infinite: Some(InfiniteScaling {
                speed_increment: 0.05,
                speed_cap: 2.0,
            }),
        },
    ]
}

impl Settings {
    /// Table a pattern is laid out on
    pub fn region_for(&self, kind: PatternKind) -> Region {
        self.region_overrides
            .iter()
            .find(|o| o.pattern == kind)
            .map(|o| Region::new(o.width, o.height))
            .unwrap_or(self.region)
    }

    /// Check everything the engine relies on and build the tier ledger
    pub fn validate(&self) -> Result<DifficultyLedger, ArrangeError> {
        if self.face_count < 2 {
            return Err(ArrangeError::InvalidSettings(format!(
                "face_count must be at least 2, got {}",
                self.face_count
            )));
        }
        if self.tint_count == 0 {
            return Err(ArrangeError::InvalidSettings(
                "tint_count must be at least 1".to_string(),
            ));
        }
        if self.card_size.x <= 0.0 || self.card_size.y <= 0.0 {
            return Err(ArrangeError::InvalidSettings(format!(
                "card size must be positive, got {:?}",
                self.card_size
            )));
        }
        if self.region.width <= 0.0 || self.region.height <= 0.0 {
            return Err(ArrangeError::InvalidSettings(format!(
                "region must be positive, got {}x{}",
                self.region.width, self.region.height
            )));
        }
        DifficultyLedger::new(self.tiers.clone())
    }

    /// Parse settings from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ArrangeError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ArrangeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ArrangeError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!(
            "Loaded settings from {} ({} tiers)",
            path.display(),
            settings.tiers.len()
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let ledger = Settings::default().validate().unwrap();
        assert_eq!(ledger.tiers().len(), 6);
        assert!(ledger.tiers().last().unwrap().infinite.is_some());
    }

    #[test]
    fn test_default_tiers_cover_every_pattern() {
        let settings = Settings::default();
        for kind in PatternKind::ALL {
            assert!(
                settings.tiers.iter().any(|t| t.rule(kind).is_some()),
                "{} never offered",
                kind
            );
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "only_one_color": true, "face_count": 6 }"#).unwrap();
        assert!(settings.only_one_color);
        assert_eq!(settings.face_count, 6);
        assert_eq!(settings.tiers, Settings::default().tiers);
    }

    #[test]
    fn test_json_round_trip() {
        let json = Settings::default().to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), Settings::default());
    }

    #[test]
    fn test_empty_tiers_rejected() {
        let err = Settings::from_json(r#"{ "tiers": [] }"#).unwrap_err();
        assert!(matches!(err, ArrangeError::NoTiers));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_pattern_set_rejected() {
        let err =
            Settings::from_json(r#"{ "tiers": [ { "threshold": 0, "patterns": [] } ] }"#).unwrap_err();
        assert!(matches!(err, ArrangeError::EmptyPatternSet { tier: 0 }));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = Settings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ArrangeError::Parse(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_region_override() {
        let settings = Settings::default();
        assert_eq!(
            settings.region_for(PatternKind::ConcentricRotate),
            Region::new(1000.0, 1000.0)
        );
        assert_eq!(settings.region_for(PatternKind::Grid), settings.region);
    }
}
