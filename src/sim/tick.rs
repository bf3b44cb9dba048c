//! Fixed timestep driver
//!
//! Feeds round-owner notifications into the controller and advances motion
//! deterministically. Hosts call [`FixedStep::advance`] once per frame with
//! the wall-clock delta; one-shot inputs are consumed by the first substep.

use super::arrangement::ArrangementController;
use super::card::CardId;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::ArrangeError;

/// Notifications for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Begin a new round
    pub round_start: bool,
    /// Latest score, if it changed
    pub score: Option<u64>,
    /// Player picked this card and it was not the wanted one
    pub wrong_selection: Option<CardId>,
    /// Player found the wanted card
    pub advance_wanted: bool,
    /// Reveal animation for the current layout finished
    pub entry_complete: bool,
    /// Round ended
    pub round_over: bool,
}

impl TickInput {
    /// Drop one-shot notifications after they were processed
    pub fn clear_one_shots(&mut self) {
        *self = Self::default();
    }
}

/// Advance the controller by one fixed timestep
///
/// Notifications are applied in a fixed order before motion runs: round start,
/// wrong selection, score, advance, reveal completion, round over.
pub fn tick(
    controller: &mut ArrangementController,
    input: &TickInput,
    dt: f32,
) -> Result<(), ArrangeError> {
    if input.round_start {
        controller.on_round_start()?;
    }
    if let Some(card) = input.wrong_selection {
        controller.on_wrong_selection(card);
    }
    if let Some(score) = input.score {
        controller.on_score_changed(score);
    }
    if input.advance_wanted {
        controller.on_advance_wanted()?;
    }
    if input.entry_complete {
        controller.notify_entry_animation_complete();
    }
    if input.round_over {
        controller.on_round_over();
        return Ok(());
    }

    controller.tick(dt);
    Ok(())
}

/// Accumulates frame time into whole simulation steps
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leftover time not yet simulated
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Run as many fixed ticks as `frame_dt` covers, capped per frame.
    /// Returns the number of ticks run.
    pub fn advance(
        &mut self,
        controller: &mut ArrangementController,
        input: &mut TickInput,
        frame_dt: f32,
    ) -> Result<u32, ArrangeError> {
        // Avoid a spiral after long stalls
        self.accumulator += frame_dt.clamp(0.0, 0.25);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let result = tick(controller, input, SIM_DT);
            input.clear_one_shots();
            result?;
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::debug!("dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        Ok(substeps)
    }
}
