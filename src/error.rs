//! Error taxonomy
//!
//! Only configuration problems are errors. Placement degradation, wanted-card
//! repairs and stale references are recovered in place and reported as
//! [`crate::sim::ArrangementEvent`]s instead.

/// Fatal configuration errors; round setup aborts when one is returned
#[derive(Debug, thiserror::Error)]
pub enum ArrangeError {
    #[error("no difficulty tiers configured")]
    NoTiers,
    #[error("difficulty tier {tier} has no eligible patterns")]
    EmptyPatternSet { tier: usize },
    #[error("difficulty tier {tier} is invalid: {reason}")]
    InvalidTier { tier: usize, reason: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}

impl ArrangeError {
    /// True for errors caused by the tier/pattern tables themselves
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ArrangeError::NoTiers
                | ArrangeError::EmptyPatternSet { .. }
                | ArrangeError::InvalidTier { .. }
                | ArrangeError::InvalidSettings(_)
        )
    }
}
