//! Initial card layouts
//!
//! Pure positioning: given a pattern, a card count, a region and a seeded rng,
//! the same inputs always produce the same slots. No animation happens here.
//!
//! Layout families:
//! - Grid / AlignedSweep / ColumnSweep: rows of fixed spacing, last row centered
//!   (ColumnSweep keeps the last row on the full-row columns so lanes line up)
//! - Columns: fixed column count, remainder goes to the first columns
//! - ConcentricCircles / ConcentricRotate: rings under a density cap
//! - Wave / WaveWrap: rows spread edge to edge with a sine offset per column
//! - everything else: validated random scatter

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::pattern::Pattern;
use super::placement::PositionValidator;
use super::region::Region;
use crate::consts::RING_RADIUS_LIMIT;
use crate::polar_to_cartesian;

/// Where one card starts and which lane it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub pos: Vec2,
    /// Row, column or ring index depending on the family (0 for scatter)
    pub lane: u32,
    /// Per-card phase seed: wave phase in radians for waves, angle for rings,
    /// a value in [0, 1) for scattered layouts
    pub phase: f32,
}

/// Output of a layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub slots: Vec<Slot>,
    /// Region available to card centers
    pub bounds: Region,
    /// Cards placed without their minimum distance or past the ring density cap
    pub degraded: usize,
}

impl Layout {
    pub fn positions(&self) -> Vec<Vec2> {
        self.slots.iter().map(|s| s.pos).collect()
    }

    pub fn lane_count(&self) -> u32 {
        self.slots.iter().map(|s| s.lane + 1).max().unwrap_or(0)
    }
}

/// Computes slots for every pattern family
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    pub card_size: Vec2,
    pub min_distance: f32,
    pub validator: PositionValidator,
}

impl LayoutEngine {
    pub fn new(card_size: Vec2, min_distance: f32, validator: PositionValidator) -> Self {
        Self {
            card_size,
            min_distance,
            validator,
        }
    }

    pub fn compute(
        &self,
        pattern: &Pattern,
        count: usize,
        region: &Region,
        rng: &mut impl Rng,
    ) -> Layout {
        let bounds = region.for_card(self.card_size);
        let mut degraded = 0;

        let slots = match pattern {
            Pattern::Grid { spacing }
            | Pattern::AlignedSweep { spacing, .. }
            | Pattern::ColumnSweep { spacing, .. } => {
                let column_lanes = matches!(pattern, Pattern::ColumnSweep { .. });
                grid_slots(count, &bounds, *spacing, column_lanes)
            }
            Pattern::Columns { columns, spacing_y } => {
                column_slots(count, &bounds, *columns, *spacing_y)
            }
            Pattern::ConcentricCircles {
                ring_step,
                footprint,
            }
            | Pattern::ConcentricRotate {
                ring_step,
                footprint,
                ..
            } => {
                let rotation = rng.random_range(0.0..TAU);
                let (slots, overfilled) =
                    ring_slots(count, &bounds, *ring_step, *footprint, rotation);
                degraded = overfilled;
                slots
            }
            Pattern::Wave {
                max_rows,
                amplitude,
                phase_step,
                ..
            }
            | Pattern::WaveWrap {
                max_rows,
                amplitude,
                phase_step,
                ..
            } => {
                let phase_seed = rng.random_range(0.0..TAU);
                wave_slots(
                    count,
                    &bounds,
                    self.card_size,
                    *max_rows,
                    *amplitude,
                    *phase_step,
                    phase_seed,
                )
            }
            Pattern::StaticRandom
            | Pattern::SlowWander { .. }
            | Pattern::FastWander { .. }
            | Pattern::Pulse { .. }
            | Pattern::QuantumTeleport { .. }
            | Pattern::GravityWells(_) => {
                let (positions, missed) =
                    self.validator
                        .scatter(&bounds, count, self.min_distance, rng);
                degraded = missed;
                positions
                    .into_iter()
                    .map(|pos| Slot {
                        pos,
                        lane: 0,
                        phase: rng.random_range(0.0..1.0),
                    })
                    .collect()
            }
        };

        if degraded > 0 {
            log::debug!(
                "{} layout: {} of {} placements degraded",
                pattern.kind(),
                degraded,
                count
            );
        }

        Layout {
            slots,
            bounds,
            degraded,
        }
    }
}

/// Cards per full row and number of rows for a grid
pub fn grid_shape(count: usize, width: f32, spacing_x: f32) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let per_row = if spacing_x > 0.0 {
        (width / spacing_x).floor() as usize + 1
    } else {
        count
    };
    let per_row = per_row.clamp(1, count);
    (per_row, count.div_ceil(per_row))
}

/// Offsets of `n` evenly spaced items centered on zero
fn centered(n: usize, spacing: f32) -> impl Iterator<Item = f32> {
    let half = (n.max(1) - 1) as f32 / 2.0;
    (0..n).map(move |i| (i as f32 - half) * spacing)
}

/// Spacing that fits `n` items into `extent`, never above `preferred`
fn fitted_spacing(n: usize, extent: f32, preferred: f32) -> f32 {
    if n > 1 {
        preferred.min(extent / (n - 1) as f32)
    } else {
        preferred
    }
}

fn grid_slots(count: usize, bounds: &Region, spacing: Vec2, column_lanes: bool) -> Vec<Slot> {
    let (per_row, rows) = grid_shape(count, bounds.width, spacing.x);
    let spacing_y = fitted_spacing(rows, bounds.height, spacing.y);
    let row_ys: Vec<f32> = centered(rows, spacing_y).collect();

    let mut slots = Vec::with_capacity(count);
    for (row, y) in row_ys.iter().enumerate() {
        let in_row = (count - row * per_row).min(per_row);
        // Top row first
        let y = -*y;
        if column_lanes {
            // Short row sits on the middle full-row columns; lane = physical column
            let first = (per_row - in_row) / 2;
            for (col, x) in centered(per_row, spacing.x)
                .enumerate()
                .skip(first)
                .take(in_row)
            {
                slots.push(Slot {
                    pos: Vec2::new(x, y),
                    lane: col as u32,
                    phase: 0.0,
                });
            }
        } else {
            for x in centered(in_row, spacing.x) {
                slots.push(Slot {
                    pos: Vec2::new(x, y),
                    lane: row as u32,
                    phase: 0.0,
                });
            }
        }
    }
    slots
}

/// Cards per column, remainder assigned to the first columns
pub fn column_sizes(count: usize, columns: u32) -> Vec<usize> {
    let columns = (columns.max(1) as usize).min(count.max(1));
    let base = count / columns;
    let remainder = count % columns;
    (0..columns)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

fn column_slots(count: usize, bounds: &Region, columns: u32, spacing_y: f32) -> Vec<Slot> {
    let sizes = column_sizes(count, columns);
    let column_width = bounds.width / sizes.len() as f32;

    let mut slots = Vec::with_capacity(count);
    for (col, &size) in sizes.iter().enumerate() {
        let x = -bounds.width / 2.0 + (col as f32 + 0.5) * column_width;
        let spacing = fitted_spacing(size, bounds.height, spacing_y);
        for y in centered(size, spacing) {
            slots.push(Slot {
                pos: Vec2::new(x, -y),
                lane: col as u32,
                phase: 0.0,
            });
        }
    }
    slots
}

/// Ring radii and card counts, innermost first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingPlan {
    pub rings: Vec<(f32, usize)>,
    /// Cards pushed past the density cap because no ring fit under the limit
    pub overfilled: usize,
}

/// Spread `count` cards over rings whose radius stays under the limit for
/// `bounds` (the region available to card centers)
pub fn ring_plan(count: usize, bounds: &Region, ring_step: f32, footprint: f32) -> RingPlan {
    if count == 0 {
        return RingPlan::default();
    }
    let footprint = footprint.max(1.0);
    let step = if ring_step > 0.0 { ring_step } else { footprint };
    let limit = RING_RADIUS_LIMIT * bounds.min_side();

    let mut rings: Vec<(f32, usize)> = Vec::new();
    let mut remaining = count;
    let mut radius = step;
    while remaining > 0 {
        if !rings.is_empty() && radius >= limit {
            break;
        }
        let capacity = ((TAU * radius / footprint).floor() as usize).max(1);
        let take = capacity.min(remaining);
        rings.push((radius, take));
        remaining -= take;
        radius += step;
    }

    // Out of room: overfill from the outermost ring inward
    let overfilled = remaining;
    if overfilled > 0 {
        log::debug!(
            "ring layout over density cap: {} of {} cards overfilled",
            overfilled,
            count
        );
    }
    let ring_count = rings.len();
    let mut i = 0;
    while remaining > 0 {
        rings[ring_count - 1 - (i % ring_count)].1 += 1;
        remaining -= 1;
        i += 1;
    }
    RingPlan { rings, overfilled }
}

/// Ring slots plus the number of cards placed past the density cap
fn ring_slots(
    count: usize,
    bounds: &Region,
    ring_step: f32,
    footprint: f32,
    rotation: f32,
) -> (Vec<Slot>, usize) {
    let plan = ring_plan(count, bounds, ring_step, footprint);
    let mut slots = Vec::with_capacity(count);
    for (ring, &(radius, n)) in plan.rings.iter().enumerate() {
        let offset = rotation + ring as f32 * 0.5;
        let spacing = TAU / n.max(1) as f32;
        for i in 0..n {
            let angle = crate::normalize_angle(offset + i as f32 * spacing);
            slots.push(Slot {
                pos: polar_to_cartesian(radius, angle),
                lane: ring as u32,
                phase: angle,
            });
        }
    }
    (slots, plan.overfilled)
}

#[allow(clippy::too_many_arguments)]
fn wave_slots(
    count: usize,
    bounds: &Region,
    card_size: Vec2,
    max_rows: u32,
    amplitude: f32,
    phase_step: f32,
    phase_seed: f32,
) -> Vec<Slot> {
    if count == 0 {
        return Vec::new();
    }
    let amplitude = amplitude.max(0.0);
    let band = bounds.inset(Vec2::new(0.0, amplitude));

    let row_capacity = if card_size.x > 0.0 {
        ((band.width / card_size.x).floor() as usize + 1).max(1)
    } else {
        count
    };
    let rows = count
        .div_ceil(row_capacity)
        .clamp(1, max_rows.max(1) as usize)
        .min(count);
    let per_row = count.div_ceil(rows);
    let row_spacing = if rows > 1 {
        band.height / (rows - 1) as f32
    } else {
        0.0
    };

    let mut slots = Vec::with_capacity(count);
    for row in 0..rows {
        let in_row = (count - slots.len()).min(per_row);
        if in_row == 0 {
            break;
        }
        let base_y = if rows > 1 {
            band.height / 2.0 - row as f32 * row_spacing
        } else {
            0.0
        };
        let column_spacing = if in_row > 1 {
            band.width / (in_row - 1) as f32
        } else {
            0.0
        };
        for col in 0..in_row {
            let x = if in_row > 1 {
                -band.width / 2.0 + col as f32 * column_spacing
            } else {
                0.0
            };
            let phase = phase_seed + col as f32 * phase_step;
            slots.push(Slot {
                pos: Vec2::new(x, base_y + amplitude * phase.sin()),
                lane: row as u32,
                phase,
            });
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pattern::{PatternCatalog, PatternKind};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(Vec2::new(80.0, 110.0), 90.0, PositionValidator::default())
    }

    #[test]
    fn test_columns_remainder_first() {
        assert_eq!(column_sizes(7, 2), vec![4, 3]);
        assert_eq!(column_sizes(10, 4), vec![3, 3, 2, 2]);
        assert_eq!(column_sizes(2, 5), vec![1, 1]);
        assert_eq!(column_sizes(0, 3), vec![0]);
    }

    #[test]
    fn test_columns_layout_seven_cards_two_columns() {
        let pattern = Pattern::Columns {
            columns: 2,
            spacing_y: 130.0,
        };
        let mut rng = Pcg32::seed_from_u64(1);
        let layout = engine().compute(&pattern, 7, &Region::new(800.0, 900.0), &mut rng);
        assert_eq!(layout.slots.len(), 7);

        let mut xs: Vec<f32> = layout.slots.iter().map(|s| s.pos.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        xs.dedup();
        assert_eq!(xs.len(), 2);

        let first = layout.slots.iter().filter(|s| s.lane == 0).count();
        let second = layout.slots.iter().filter(|s| s.lane == 1).count();
        assert_eq!((first, second), (4, 3));
    }

    #[test]
    fn test_columns_shrink_spacing_to_fit() {
        let pattern = Pattern::Columns {
            columns: 1,
            spacing_y: 200.0,
        };
        let mut rng = Pcg32::seed_from_u64(2);
        let region = Region::new(400.0, 510.0);
        let layout = engine().compute(&pattern, 6, &region, &mut rng);
        for slot in &layout.slots {
            assert!(layout.bounds.contains(slot.pos), "{:?} outside", slot.pos);
        }
    }

    #[test]
    fn test_grid_last_row_centered() {
        let pattern = Pattern::Grid {
            spacing: Vec2::new(100.0, 130.0),
        };
        let mut rng = Pcg32::seed_from_u64(3);
        // 300 px of center room fits 4 per row
        let layout = engine().compute(&pattern, 6, &Region::new(380.0, 800.0), &mut rng);
        assert_eq!(grid_shape(6, layout.bounds.width, 100.0), (4, 2));

        let last_row: Vec<f32> = layout
            .slots
            .iter()
            .filter(|s| s.lane == 1)
            .map(|s| s.pos.x)
            .collect();
        assert_eq!(last_row.len(), 2);
        assert!((last_row[0] + last_row[1]).abs() < 1e-4);
    }

    #[test]
    fn test_single_card_layouts_do_not_divide_by_zero() {
        let catalog = PatternCatalog::default();
        let mut rng = Pcg32::seed_from_u64(4);
        for kind in PatternKind::ALL {
            let pattern = catalog.build(kind, 40.0);
            let layout = engine().compute(&pattern, 1, &Region::new(600.0, 600.0), &mut rng);
            assert_eq!(layout.slots.len(), 1, "{}", kind);
            assert!(layout.slots[0].pos.is_finite(), "{}", kind);
        }
    }

    #[test]
    fn test_ring_plan_respects_radius_limit() {
        let region = Region::new(800.0, 600.0);
        let plan = ring_plan(20, &region, 100.0, 90.0);
        assert_eq!(plan.rings.iter().map(|(_, n)| n).sum::<usize>(), 20);
        assert!(plan.rings.iter().all(|(r, _)| *r < 0.45 * 600.0));
        assert_eq!(plan.overfilled, 0);
        // Inner ring at 100 px holds floor(2π·100/90) = 6 cards
        assert_eq!(plan.rings[0], (100.0, 6));
    }

    #[test]
    fn test_ring_plan_overfills_when_out_of_room() {
        let region = Region::new(200.0, 200.0);
        let plan = ring_plan(30, &region, 100.0, 90.0);
        assert_eq!(plan.rings.len(), 1);
        assert_eq!(plan.rings[0].1, 30);
        // floor(2π·100/90) = 6 fit under the cap
        assert_eq!(plan.overfilled, 24);
    }

    #[test]
    fn test_ring_layout_stays_inside_card_bounds() {
        let pattern = Pattern::ConcentricRotate {
            ring_step: 120.0,
            footprint: 95.0,
            angular_speed: 0.5,
        };
        let mut rng = Pcg32::seed_from_u64(8);
        let layout = engine().compute(&pattern, 30, &Region::new(1000.0, 1000.0), &mut rng);
        assert_eq!(layout.slots.len(), 30);
        for slot in &layout.slots {
            assert!(layout.bounds.contains(slot.pos), "{:?} outside", slot.pos);
        }
    }

    #[test]
    fn test_ring_overflow_reported_as_degraded() {
        let pattern = Pattern::ConcentricCircles {
            ring_step: 100.0,
            footprint: 90.0,
        };
        let mut rng = Pcg32::seed_from_u64(9);
        let layout = engine().compute(&pattern, 30, &Region::new(300.0, 300.0), &mut rng);
        assert_eq!(layout.slots.len(), 30);
        assert!(layout.degraded > 0);
    }

    #[test]
    fn test_column_sweep_lanes_follow_physical_columns() {
        let pattern = Pattern::ColumnSweep {
            spacing: Vec2::new(100.0, 130.0),
            speed: 90.0,
        };
        let mut rng = Pcg32::seed_from_u64(10);
        for count in 5..=7 {
            let layout = engine().compute(&pattern, count, &Region::new(380.0, 800.0), &mut rng);
            assert_eq!(layout.slots.len(), count);
            for a in &layout.slots {
                for b in &layout.slots {
                    if (a.pos.x - b.pos.x).abs() < 1e-3 {
                        assert_eq!(a.lane % 2, b.lane % 2, "x {} split across lanes", a.pos.x);
                    }
                }
            }
        }
    }

    #[test]
    fn test_wave_rows_capped() {
        let pattern = Pattern::Wave {
            max_rows: 2,
            amplitude: 20.0,
            phase_step: 0.5,
            frequency: 1.0,
        };
        let mut rng = Pcg32::seed_from_u64(5);
        let layout = engine().compute(&pattern, 30, &Region::new(500.0, 600.0), &mut rng);
        assert_eq!(layout.slots.len(), 30);
        assert_eq!(layout.lane_count(), 2);
        for slot in &layout.slots {
            assert!(layout.bounds.contains(slot.pos));
        }
    }

    #[test]
    fn test_scatter_layout_in_bounds() {
        let mut rng = Pcg32::seed_from_u64(6);
        let layout = engine().compute(
            &Pattern::StaticRandom,
            12,
            &Region::new(900.0, 700.0),
            &mut rng,
        );
        assert_eq!(layout.slots.len(), 12);
        assert!(layout.slots.iter().all(|s| layout.bounds.contains(s.pos)));
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_layout(seed in any::<u64>(), count in 1usize..30, index in 0usize..14) {
            let kind = PatternKind::ALL[index];
            let pattern = PatternCatalog::default().build(kind, 60.0);
            let region = Region::new(900.0, 1200.0);
            let a = engine().compute(&pattern, count, &region, &mut Pcg32::seed_from_u64(seed));
            let b = engine().compute(&pattern, count, &region, &mut Pcg32::seed_from_u64(seed));
            prop_assert_eq!(a.positions(), b.positions());
            prop_assert_eq!(a.slots.len(), count);
        }
    }
}
