//! Deterministic arrangement module
//!
//! All layout and movement logic lives here. This module must be pure and
//! deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (cards in slot order, tasks in spawn order)
//! - No rendering or platform dependencies

pub mod arrangement;
pub mod card;
pub mod difficulty;
pub mod gravity;
pub mod layout;
pub mod movement;
pub mod pattern;
pub mod placement;
pub mod region;
pub mod tick;

pub use arrangement::{ArrangementController, ArrangementEvent, ArrangementPhase};
pub use card::{Card, CardId, CardView};
pub use difficulty::{DifficultyLedger, DifficultyTier, InfiniteScaling, PatternHistory, PatternRule};
pub use gravity::{GravityFieldSimulator, GravityParams, GravitySource};
pub use layout::{Layout, LayoutEngine, RingPlan, Slot};
pub use movement::{MotionEnv, MovementScheduler, MovementTask, TaskState, TaskStep};
pub use pattern::{Pattern, PatternCatalog, PatternKind, PatternParams};
pub use placement::{Placement, PositionValidator};
pub use region::{Rect, Region};
pub use tick::{FixedStep, TickInput, tick};
