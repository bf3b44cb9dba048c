//! Card entities
//!
//! Positions are written only by the layout pass and the movement scheduler.
//! Everything else reads them through [`CardView`] snapshots.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::region::Rect;

/// Stable card identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A card on the table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub pos: Vec2,
    /// Visual scale (0 while waiting for the reveal, pulsing patterns vary it)
    pub scale: f32,
    pub active: bool,
    pub wanted: bool,
    /// Character shown on the card
    pub face: u16,
    /// Color variant of the face
    pub tint: u8,
}

impl Card {
    pub fn new(id: CardId) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            scale: 0.0,
            active: true,
            wanted: false,
            face: 0,
            tint: 0,
        }
    }

    /// Bounding box at the current scale
    pub fn rect(&self, card_size: Vec2) -> Rect {
        Rect::new(self.pos, card_size * self.scale.max(0.0))
    }

    /// Bounding box at full size, regardless of current scale
    pub fn full_rect(&self, card_size: Vec2) -> Rect {
        Rect::new(self.pos, card_size)
    }

    pub fn view(&self) -> CardView {
        CardView {
            id: self.id,
            pos: self.pos,
            scale: self.scale,
            wanted: self.wanted,
            active: self.active,
            face: self.face,
            tint: self.tint,
        }
    }
}

/// Read-only card snapshot for the presentation and input layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub pos: Vec2,
    pub scale: f32,
    pub wanted: bool,
    pub active: bool,
    pub face: u16,
    pub tint: u8,
}

/// Positions of active cards other than `skip`
pub fn occupied_positions(cards: &[Card], skip: Option<CardId>) -> Vec<Vec2> {
    cards
        .iter()
        .filter(|c| c.active && Some(c.id) != skip)
        .map(|c| c.pos)
        .collect()
}
