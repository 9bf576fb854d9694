//! Tick-driven simulation step
//!
//! The host delivers discrete intents plus elapsed milliseconds. Intents are
//! applied first, at the current clock, then the clock advances and every
//! timer that came due fires in a fixed order.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::pieces::RotateDir;
use super::rejection::Rejection;
use super::state::GameState;

/// A discrete player gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    SelectCell { x: i32, y: i32 },
    Move { dx: i32 },
    Rotate(RotateDir),
    SoftDrop,
    HardDrop,
    ToggleEmpowerMode,
    ToggleRouteMode,
    PlaceOrSelectFlowNode { index: usize },
    StabilizeRoute,
    TriggerShift,
    Restart,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Applied in order before timers advance
    pub intents: Vec<Intent>,
}

impl TickInput {
    pub fn new(intents: impl IntoIterator<Item = Intent>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
        }
    }

    /// No input, time only
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Apply one intent. Rejections are written to the event feed and returned.
pub fn apply_intent(state: &mut GameState, intent: Intent) -> Result<(), Rejection> {
    let result = match intent {
        Intent::SelectCell { x, y } => state.select_cell(IVec2::new(x, y)),
        Intent::Move { dx } => state.move_piece(dx),
        Intent::Rotate(dir) => state.rotate_piece(dir),
        Intent::SoftDrop => state.soft_drop(),
        Intent::HardDrop => state.hard_drop(),
        Intent::ToggleEmpowerMode => state.toggle_empower_mode().map(|_| ()),
        Intent::ToggleRouteMode => state.toggle_route_mode(),
        Intent::PlaceOrSelectFlowNode { index } => state.place_or_select(index),
        Intent::StabilizeRoute => state.stabilize_route(),
        Intent::TriggerShift => state.trigger_shift(),
        Intent::Restart => {
            state.restart();
            Ok(())
        }
    };
    if let Err(reason) = &result {
        if *reason == Rejection::GameOver {
            log::warn!("{:?} ignored after game over", intent);
        }
        state.note_rejection(reason);
    }
    result
}

/// Advance the reactor by `dt_ms`
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u64) {
    for &intent in &input.intents {
        let _ = apply_intent(state, intent);
    }

    // Timers stop with the run
    if state.is_game_over() {
        return;
    }
    let now = state.clock.advance(dt_ms);
    advance_timers(state, now);
}

fn advance_timers(state: &mut GameState, now: u64) {
    state.match_grid.update(now);

    let stack = state.stack.update(now);
    state.on_steps(stack.steps);
    if let Some(report) = stack.locked {
        state.on_lock(report, now);
    }
    if stack.spliced > 0 {
        log::debug!("spliced {} rows", stack.spliced);
    }
    state.spawn_if_idle();

    if let Some(lost) = state.combo.update(now) {
        state.cue(crate::audio::AudioCue::ComboBreak);
        state.note(format!("Combo of {} faded.", lost));
    }
    state.flow.update(now);
}
