//! Playable bounds and card rectangles
//!
//! A region is centered on the origin:
//! - x spans [-width/2, width/2]
//! - y spans [-height/2, height/2]
//!
//! Card rectangles are axis-aligned boxes around a card's center, scaled by the
//! card's current scale.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned playable bounds, centered on the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        -self.half_extents()
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.half_extents()
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f32 {
        Vec2::new(self.width, self.height).length()
    }

    /// Smaller of width and height
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Shrink by a margin on every side (never below zero size)
    pub fn inset(&self, margin: Vec2) -> Self {
        Self::new(self.width - margin.x * 2.0, self.height - margin.y * 2.0)
    }

    /// Region a card's center may occupy so the whole card stays inside
    pub fn for_card(&self, card_size: Vec2) -> Self {
        self.inset(card_size / 2.0)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let h = self.half_extents();
        point.x >= -h.x && point.x <= h.x && point.y >= -h.y && point.y <= h.y
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min(), self.max())
    }

    /// Uniform sample inside the region
    pub fn sample(&self, rng: &mut impl Rng) -> Vec2 {
        let h = self.half_extents();
        Vec2::new(
            rng.random_range(-h.x..=h.x),
            rng.random_range(-h.y..=h.y),
        )
    }
}

/// Axis-aligned rectangle given by center and full size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size: size.max(Vec2::ZERO),
        }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.size / 2.0
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.size / 2.0
    }

    /// Area of the intersection with another rectangle (0 when disjoint)
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let lo = self.min().max(other.min());
        let hi = self.max().min(other.max());
        let extent = (hi - lo).max(Vec2::ZERO);
        extent.x * extent.y
    }
}

/// Share of `target` covered by `others`, in [0, 1]
///
/// Overlaps are summed independently, so two occluders covering the same
/// patch count twice. The result is clamped to 1.
pub fn coverage(target: &Rect, others: impl IntoIterator<Item = Rect>) -> f32 {
    let area = target.area();
    if area <= 0.0 {
        return 0.0;
    }
    let covered: f32 = others.into_iter().map(|r| target.overlap_area(&r)).sum();
    (covered / area).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_region_contains_and_clamp() {
        let region = Region::new(200.0, 100.0);
        assert!(region.contains(Vec2::new(100.0, 50.0)));
        assert!(!region.contains(Vec2::new(101.0, 0.0)));
        assert_eq!(region.clamp(Vec2::new(500.0, -80.0)), Vec2::new(100.0, -50.0));
    }

    #[test]
    fn test_inset_never_negative() {
        let region = Region::new(50.0, 50.0).inset(Vec2::new(40.0, 10.0));
        assert_eq!(region.width, 0.0);
        assert_eq!(region.height, 30.0);
    }

    #[test]
    fn test_sample_stays_inside() {
        let region = Region::new(300.0, 120.0);
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..500 {
            assert!(region.contains(region.sample(&mut rng)));
        }
    }

    #[test]
    fn test_overlap_area() {
        let a = Rect::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let b = Rect::new(Vec2::new(5.0, 5.0), Vec2::new(10.0, 10.0));
        assert!((a.overlap_area(&b) - 25.0).abs() < 1e-4);

        let far = Rect::new(Vec2::new(50.0, 0.0), Vec2::new(10.0, 10.0));
        assert_eq!(a.overlap_area(&far), 0.0);
    }

    #[test]
    fn test_coverage_sums_and_clamps() {
        let target = Rect::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let left = Rect::new(Vec2::new(-5.0, 0.0), Vec2::new(10.0, 10.0));
        let right = Rect::new(Vec2::new(5.0, 0.0), Vec2::new(10.0, 10.0));
        assert!((coverage(&target, [left]) - 0.5).abs() < 1e-4);
        assert!((coverage(&target, [left, right]) - 1.0).abs() < 1e-4);
        assert!((coverage(&target, [target, target]) - 1.0).abs() < 1e-4);
    }
}
