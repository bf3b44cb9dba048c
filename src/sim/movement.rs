//! Per-card movement tasks and the scheduler that owns them
//!
//! Every moving card has exactly one task. Tasks are plain state machines
//! polled once per tick:
//!
//! ```text
//! Idle --start--> Running --cancel--> Cancelled
//!                    |
//!                    +--card gone/inactive--> Completed
//! ```
//!
//! Wander, sweep, rotate, wave, teleport and field tasks never finish on their
//! own; only cancellation ends them. The scheduler drops a task as soon as its
//! poll returns [`TaskStep::Done`]. `cancel_all` is the seam used on every
//! pattern change and at round end.

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::card::{Card, CardId, occupied_positions};
use super::gravity::{GravityFieldSimulator, GravityParams};
use super::layout::Layout;
use super::pattern::{Pattern, PulseScale, Span};
use super::placement::PositionValidator;
use super::region::Region;
use crate::{cartesian_to_polar, polar_to_cartesian, smoothstep};

/// Shortest tween, so nearby targets don't cause jitter
const MIN_TWEEN_SECS: f32 = 0.25;

/// Task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    Cancelled,
    Completed,
}

/// Result of polling a task once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStep {
    Continue,
    Done,
}

/// Sweep direction axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn component(&self, v: Vec2) -> f32 {
        match self {
            Axis::Horizontal => v.x,
            Axis::Vertical => v.y,
        }
    }

    fn with(&self, v: Vec2, value: f32) -> Vec2 {
        match self {
            Axis::Horizontal => Vec2::new(value, v.y),
            Axis::Vertical => Vec2::new(v.x, value),
        }
    }
}

/// Shared inputs every task may need while moving
#[derive(Debug, Clone, Copy)]
pub struct MotionEnv {
    /// Region available to card centers
    pub bounds: Region,
    pub validator: PositionValidator,
    pub min_distance: f32,
}

/// Eased move from one point to another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    pub elapsed: f32,
    pub duration: f32,
    pub speed: f32,
}

impl Tween {
    /// A finished tween at `pos`; the first poll picks a real target
    fn arrived(pos: Vec2, speed: f32) -> Self {
        Self {
            from: pos,
            to: pos,
            elapsed: 0.0,
            duration: 0.0,
            speed,
        }
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn retarget(&mut self, from: Vec2, to: Vec2) {
        let distance = from.distance(to);
        self.from = from;
        self.to = to;
        self.elapsed = 0.0;
        self.duration = if self.speed > 0.0 {
            (distance / self.speed).max(MIN_TWEEN_SECS)
        } else {
            f32::INFINITY
        };
    }

    fn advance(&mut self, dt: f32) -> Vec2 {
        self.elapsed += dt;
        if !self.duration.is_finite() {
            return self.from;
        }
        let t = if self.duration > 0.0 {
            self.elapsed / self.duration
        } else {
            1.0
        };
        self.from.lerp(self.to, smoothstep(t))
    }
}

/// Scale oscillation that starts after a delay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOscillator {
    pub delay: f32,
    pub elapsed: f32,
    pub scale: Span,
    pub period: f32,
}

impl ScaleOscillator {
    fn advance(&mut self, dt: f32) -> Option<f32> {
        self.elapsed += dt;
        if self.elapsed < self.delay || self.period <= 0.0 {
            return None;
        }
        let t = (self.elapsed - self.delay) / self.period;
        let half = (self.scale.max - self.scale.min) / 2.0;
        Some(self.scale.mid() + half * (t * TAU).sin())
    }
}

/// What a task does each tick
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    /// Endless re-targeting to fresh valid positions
    Wander(Tween),
    /// Constant velocity along one axis, wrapping between bounds
    Sweep {
        axis: Axis,
        velocity: f32,
        lo: f32,
        hi: f32,
    },
    /// Fixed-radius orbit around a center
    Rotate {
        center: Vec2,
        radius: f32,
        angle: f32,
        angular_speed: f32,
    },
    /// Wander plus an independent scale pulse
    Pulse {
        wander: Tween,
        scale: ScaleOscillator,
    },
    /// Vertical sine bob around a base height, optionally scrolling
    Wave {
        base_y: f32,
        amplitude: f32,
        frequency: f32,
        phase: f32,
        drift: f32,
        lo: f32,
        hi: f32,
    },
    /// Periodic jump to a fresh valid position
    Teleport { interval: f32, timer: f32 },
    /// Drift under the gravity field
    Field,
}

/// A movement task bound to one card
#[derive(Debug, Clone)]
pub struct MovementTask {
    entity: CardId,
    state: TaskState,
    motion: Motion,
}

impl MovementTask {
    pub fn new(entity: CardId, motion: Motion) -> Self {
        Self {
            entity,
            state: TaskState::Idle,
            motion,
        }
    }

    pub fn entity(&self) -> CardId {
        self.entity
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn start(&mut self) {
        if self.state == TaskState::Idle {
            self.state = TaskState::Running;
        }
    }

    pub fn cancel(&mut self) {
        if matches!(self.state, TaskState::Idle | TaskState::Running) {
            self.state = TaskState::Cancelled;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Poll once. Writes at most the bound card; never runs unless Running.
    pub fn tick(
        &mut self,
        cards: &mut [Card],
        index: usize,
        dt: f32,
        env: &MotionEnv,
        field: Option<&GravityFieldSimulator>,
        rng: &mut impl Rng,
    ) -> TaskStep {
        if self.state != TaskState::Running {
            return TaskStep::Done;
        }
        if !cards[index].active {
            self.state = TaskState::Completed;
            return TaskStep::Done;
        }

        match &mut self.motion {
            Motion::Wander(tween) => {
                let pos = step_wander(tween, cards, index, dt, env, rng);
                cards[index].pos = pos;
            }
            Motion::Pulse { wander, scale } => {
                let pos = step_wander(wander, cards, index, dt, env, rng);
                let card = &mut cards[index];
                card.pos = pos;
                if let Some(s) = scale.advance(dt) {
                    card.scale = s;
                }
            }
            Motion::Sweep {
                axis,
                velocity,
                lo,
                hi,
            } => {
                let card = &mut cards[index];
                let along = axis.component(card.pos) + *velocity * dt;
                card.pos = axis.with(card.pos, wrap(along, *lo, *hi));
            }
            Motion::Rotate {
                center,
                radius,
                angle,
                angular_speed,
            } => {
                *angle = crate::normalize_angle(*angle + *angular_speed * dt);
                cards[index].pos = *center + polar_to_cartesian(*radius, *angle);
            }
            Motion::Wave {
                base_y,
                amplitude,
                frequency,
                phase,
                drift,
                lo,
                hi,
            } => {
                *phase += *frequency * dt;
                if *phase > TAU * 64.0 {
                    *phase -= TAU * 64.0;
                }
                let card = &mut cards[index];
                let x = if *drift != 0.0 {
                    wrap(card.pos.x + *drift * dt, *lo, *hi)
                } else {
                    card.pos.x
                };
                card.pos = Vec2::new(x, *base_y + *amplitude * phase.sin());
            }
            Motion::Teleport { interval, timer } => {
                *timer -= dt;
                if *timer <= 0.0 {
                    let others = occupied_positions(cards, Some(cards[index].id));
                    let placement =
                        env.validator
                            .propose(&env.bounds, &others, env.min_distance, rng);
                    cards[index].pos = placement.pos;
                    *timer += interval.max(dt);
                }
            }
            Motion::Field => {
                if let Some(field) = field {
                    let card = &mut cards[index];
                    card.pos = field.displace(card.pos, dt);
                }
            }
        }
        TaskStep::Continue
    }
}

fn step_wander(
    tween: &mut Tween,
    cards: &[Card],
    index: usize,
    dt: f32,
    env: &MotionEnv,
    rng: &mut impl Rng,
) -> Vec2 {
    if tween.is_done() {
        let current = cards[index].pos;
        let others = occupied_positions(cards, Some(cards[index].id));
        let placement = env
            .validator
            .propose(&env.bounds, &others, env.min_distance, rng);
        tween.retarget(current, placement.pos);
    }
    tween.advance(dt)
}

/// Wrap a coordinate into [lo, hi]
fn wrap(value: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if span <= 0.0 {
        return lo;
    }
    if value > hi {
        lo + (value - hi) % span
    } else if value < lo {
        hi - (lo - value) % span
    } else {
        value
    }
}

/// Owns every running movement task
#[derive(Debug, Default)]
pub struct MovementScheduler {
    tasks: Vec<MovementTask>,
    field: Option<GravityFieldSimulator>,
    suppress_cancel: bool,
}

impl MovementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[MovementTask] {
        &self.tasks
    }

    pub fn running_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_running()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.running_count() == 0
    }

    /// State of the latest task bound to `entity`
    pub fn task_state(&self, entity: CardId) -> Option<TaskState> {
        self.tasks
            .iter()
            .rev()
            .find(|t| t.entity == entity)
            .map(|t| t.state)
    }

    pub fn field(&self) -> Option<&GravityFieldSimulator> {
        self.field.as_ref()
    }

    /// Start a task, cancelling any task already bound to the same card
    pub fn spawn(&mut self, mut task: MovementTask) {
        self.tasks.retain(|t| t.is_running());
        if let Some(existing) = self
            .tasks
            .iter_mut()
            .find(|t| t.entity == task.entity && t.is_running())
        {
            log::warn!("card {} already had a running task; replacing it", task.entity);
            existing.cancel();
        }
        task.start();
        self.tasks.push(task);
    }

    pub fn start_wander(&mut self, entity: CardId, origin: Vec2, speed: f32) {
        self.spawn(MovementTask::new(
            entity,
            Motion::Wander(Tween::arrived(origin, speed)),
        ));
    }

    /// Sweep cards along `axis`; even lanes move forward, odd lanes backward
    pub fn start_sweep(
        &mut self,
        lanes: &[(CardId, u32)],
        axis: Axis,
        speed: f32,
        bounds: (f32, f32),
    ) {
        for &(entity, lane) in lanes {
            let direction = if lane % 2 == 0 { 1.0 } else { -1.0 };
            self.spawn(MovementTask::new(
                entity,
                Motion::Sweep {
                    axis,
                    velocity: speed * direction,
                    lo: bounds.0,
                    hi: bounds.1,
                },
            ));
        }
    }

    /// Orbit cards around `center` at their current radius; odd rings reverse
    pub fn start_rotate(&mut self, rings: &[(CardId, Vec2, u32)], angular_speed: f32, center: Vec2) {
        for &(entity, pos, ring) in rings {
            let (radius, angle) = cartesian_to_polar(pos - center);
            let direction = if ring % 2 == 0 { 1.0 } else { -1.0 };
            self.spawn(MovementTask::new(
                entity,
                Motion::Rotate {
                    center,
                    radius,
                    angle,
                    angular_speed: angular_speed * direction,
                },
            ));
        }
    }

    /// Wander with per-card speed from `speed`, plus a delayed scale pulse
    pub fn start_pulse(
        &mut self,
        entities: &[(CardId, Vec2)],
        speed: Span,
        pulse: PulseScale,
        rng: &mut impl Rng,
    ) {
        for &(entity, pos) in entities {
            let wander = Tween::arrived(pos, speed.sample(rng));
            let scale = ScaleOscillator {
                delay: Span::new(0.0, pulse.max_delay).sample(rng),
                elapsed: 0.0,
                scale: pulse.scale,
                period: pulse.period,
            };
            self.spawn(MovementTask::new(entity, Motion::Pulse { wander, scale }));
        }
    }

    pub fn start_teleport(&mut self, entities: &[(CardId, f32)], interval: f32) {
        for &(entity, stagger) in entities {
            self.spawn(MovementTask::new(
                entity,
                Motion::Teleport {
                    interval,
                    timer: interval * (0.5 + stagger),
                },
            ));
        }
    }

    /// Hand the cards to a fresh gravity field for this session
    pub fn start_field(
        &mut self,
        entities: &[CardId],
        params: GravityParams,
        bounds: Region,
        rng: &mut impl Rng,
    ) {
        self.field = Some(GravityFieldSimulator::seeded(params, bounds, rng));
        for &entity in entities {
            self.spawn(MovementTask::new(entity, Motion::Field));
        }
    }

    /// Start the motion a pattern implies for the given cards. Positions come
    /// from the cards as they are now; lanes and phases from the layout.
    /// Returns the number of tasks started.
    pub fn start_pattern(
        &mut self,
        pattern: &Pattern,
        cards: &[Card],
        layout: &Layout,
        card_size: Vec2,
        rng: &mut impl Rng,
    ) -> usize {
        let active: Vec<(&Card, Option<&super::layout::Slot>)> = cards
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .map(|(i, c)| (c, layout.slots.get(i)))
            .collect();
        let bounds = layout.bounds;
        let before = self.running_count();

        match pattern {
            Pattern::Grid { .. }
            | Pattern::Columns { .. }
            | Pattern::StaticRandom
            | Pattern::ConcentricCircles { .. } => {}
            Pattern::SlowWander { speed } | Pattern::FastWander { speed } => {
                for (card, _) in &active {
                    self.start_wander(card.id, card.pos, *speed);
                }
            }
            Pattern::AlignedSweep { speed, .. } => {
                let lanes = lanes_of(&active);
                // Wrap once the card is fully past the edge
                let reach = bounds.width / 2.0 + card_size.x;
                self.start_sweep(&lanes, Axis::Horizontal, *speed, (-reach, reach));
            }
            Pattern::ColumnSweep { speed, .. } => {
                let lanes = lanes_of(&active);
                let reach = bounds.height / 2.0 + card_size.y;
                self.start_sweep(&lanes, Axis::Vertical, *speed, (-reach, reach));
            }
            Pattern::ConcentricRotate { angular_speed, .. } => {
                let rings: Vec<_> = active
                    .iter()
                    .map(|(c, slot)| (c.id, c.pos, slot.map_or(0, |s| s.lane)))
                    .collect();
                self.start_rotate(&rings, *angular_speed, Vec2::ZERO);
            }
            Pattern::Pulse { speed, pulse } => {
                let entities: Vec<_> = active.iter().map(|(c, _)| (c.id, c.pos)).collect();
                self.start_pulse(&entities, *speed, *pulse, rng);
            }
            Pattern::Wave {
                amplitude,
                frequency,
                ..
            }
            | Pattern::WaveWrap {
                amplitude,
                frequency,
                ..
            } => {
                let drift = match pattern {
                    Pattern::WaveWrap { speed, .. } => *speed,
                    _ => 0.0,
                };
                let reach = bounds.width / 2.0 + card_size.x;
                for (card, slot) in &active {
                    let phase = slot.map_or(0.0, |s| s.phase);
                    let base_y = slot.map_or(card.pos.y, |s| s.pos.y - *amplitude * phase.sin());
                    self.spawn(MovementTask::new(
                        card.id,
                        Motion::Wave {
                            base_y,
                            amplitude: *amplitude,
                            frequency: *frequency,
                            phase,
                            drift,
                            lo: -reach,
                            hi: reach,
                        },
                    ));
                }
            }
            Pattern::QuantumTeleport { interval } => {
                let entities: Vec<_> = active
                    .iter()
                    .map(|(c, slot)| (c.id, slot.map_or(0.0, |s| s.phase)))
                    .collect();
                self.start_teleport(&entities, *interval);
            }
            Pattern::GravityWells(params) => {
                let entities: Vec<_> = active.iter().map(|(c, _)| c.id).collect();
                self.start_field(&entities, *params, bounds, rng);
            }
        }

        let started = self.running_count() - before;
        log::debug!("{}: started {} movement tasks", pattern.kind(), started);
        started
    }

    /// Stop everything. Idempotent; nothing writes a position afterwards.
    pub fn cancel_all(&mut self) {
        for task in &mut self.tasks {
            task.cancel();
        }
        self.field = None;
        self.suppress_cancel = false;
    }

    /// Skip the next `request_cancel` in this tick cycle
    pub fn suppress_cancel_for_cycle(&mut self) {
        self.suppress_cancel = true;
    }

    pub fn cancel_suppressed(&self) -> bool {
        self.suppress_cancel
    }

    /// Cancel unless suppressed for this cycle. Returns whether it cancelled.
    pub fn request_cancel(&mut self) -> bool {
        if self.suppress_cancel {
            log::debug!("cancel suppressed after incorrect selection");
            return false;
        }
        self.cancel_all();
        true
    }

    /// Poll every running task once
    pub fn tick(&mut self, cards: &mut [Card], dt: f32, env: &MotionEnv, rng: &mut impl Rng) {
        if let Some(field) = self.field.as_mut() {
            field.step(dt, rng);
        }

        let index: HashMap<CardId, usize> =
            cards.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let field = self.field.as_ref();

        let mut finished = 0;
        // Tasks cancelled since the last tick are dropped without polling
        self.tasks.retain_mut(|task| {
            if !task.is_running() {
                return false;
            }
            let step = match index.get(&task.entity) {
                Some(&i) => task.tick(&mut *cards, i, dt, env, field, &mut *rng),
                None => {
                    task.state = TaskState::Completed;
                    TaskStep::Done
                }
            };
            if step == TaskStep::Done {
                finished += 1;
            }
            step == TaskStep::Continue
        });
        if finished > 0 {
            log::debug!("{} movement tasks finished", finished);
        }
        self.suppress_cancel = false;
    }
}

fn lanes_of(active: &[(&Card, Option<&super::layout::Slot>)]) -> Vec<(CardId, u32)> {
    active
        .iter()
        .map(|(c, slot)| (c.id, slot.map_or(0, |s| s.lane)))
        .collect()
}
