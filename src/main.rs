//! Rock Reactor entry point
//!
//! Native headless driver: loads settings, plays one seeded run with a simple
//! autopilot, reports it to the leaderboard and prints a summary.
//!
//! Usage: `rock-reactor [settings.json]`

use std::time::{SystemTime, UNIX_EPOCH};

use glam::IVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use rock_reactor::audio::LogSink;
use rock_reactor::consts::{EMPOWER_EARTH_COST, EMPOWER_WATER_COST, MATCH_SIZE, SHIFT_THRESHOLD};
use rock_reactor::sim::flow::NODE_COUNT;
use rock_reactor::sim::{GameSnapshot, GameState, Intent, Meter, TickInput, tick};
use rock_reactor::{HighScores, Settings};

/// Simulated frame length (ms)
const FRAME_MS: u64 = 16;
/// Hard cap on a demo run (ms of simulated time)
const MAX_RUN_MS: u64 = 15 * 60 * 1_000;
/// Autopilot acts every this many frames
const THINK_EVERY: u64 = 12;

/// First neighbouring pair whose swap forms a run
fn find_swap(state: &GameState) -> Option<(IVec2, IVec2)> {
    let mut scratch = Pcg32::seed_from_u64(0);
    for y in 0..MATCH_SIZE {
        for x in 0..MATCH_SIZE {
            let a = IVec2::new(x, y);
            for b in [a + IVec2::X, a + IVec2::Y] {
                let mut probe = state.match_grid.clone();
                if probe.try_swap(a, b, &mut scratch).is_ok() {
                    return Some((a, b));
                }
            }
        }
    }
    None
}

/// First anchor where the head schematic fits
fn find_anchor(state: &GameState) -> Option<usize> {
    let head = state.schematics.head()?;
    (0..NODE_COUNT).find(|&i| state.flow.footprint(head, i).1.is_ok())
}

/// Pick the intents for one decision step
fn autopilot(state: &GameState, frame: u64) -> Vec<Intent> {
    let mut intents = Vec::new();

    if !state.match_grid.is_resolving() {
        if state.economy.level(Meter::Earth) >= EMPOWER_EARTH_COST
            && state.economy.level(Meter::Water) >= EMPOWER_WATER_COST
        {
            let cell = IVec2::new((frame % MATCH_SIZE as u64) as i32, 0);
            if !state.empower_mode {
                intents.push(Intent::ToggleEmpowerMode);
            }
            intents.push(Intent::SelectCell {
                x: cell.x,
                y: cell.y,
            });
        } else if let Some((a, b)) = find_swap(state) {
            intents.push(Intent::SelectCell { x: a.x, y: a.y });
            intents.push(Intent::SelectCell { x: b.x, y: b.y });
        }
    }

    if let Some(piece) = state.stack.active {
        // Spread pieces across the stack before dropping
        let target = ((frame / THINK_EVERY) % 8) as i32 - 1;
        let dx = (target - piece.origin.x).signum();
        if dx != 0 {
            intents.push(Intent::Move { dx });
        } else {
            intents.push(Intent::HardDrop);
        }
    }

    if let Some(anchor) = find_anchor(state) {
        intents.push(Intent::PlaceOrSelectFlowNode { index: anchor });
    }

    if state.economy.level(Meter::Shift) >= SHIFT_THRESHOLD {
        intents.push(Intent::TriggerShift);
    }
    intents
}

fn main() {
    env_logger::init();
    log::info!("Rock Reactor (native) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let seed = settings.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    });

    let mut scores = HighScores::load_from(&settings.high_score_path).unwrap_or_else(|e| {
        log::warn!("High scores unavailable, starting fresh: {}", e);
        HighScores::new()
    });
    let mut audio = LogSink::new(!settings.cues_enabled);
    let mut state = GameState::with_settings(seed, &settings);

    let mut frame = 0;
    while !state.is_game_over() && state.now() < MAX_RUN_MS {
        let input = if frame % THINK_EVERY == 0 {
            TickInput::new(autopilot(&state, frame))
        } else {
            TickInput::idle()
        };
        tick(&mut state, &input, FRAME_MS);
        state.dispatch(&mut audio, &mut scores);
        frame += 1;
    }

    let snap = GameSnapshot::capture(&state);
    if let Err(e) = scores.save_to(&settings.high_score_path) {
        log::warn!("Could not save high scores: {}", e);
    }

    println!("\nRock Reactor run (seed {})", seed);
    println!(
        "  score {}  lines {}  circuits {}  integrity {:.1}",
        snap.run.score, snap.run.lines_cleared, snap.run.circuits_completed, snap.run.integrity
    );
    println!("  best combo {}  time {} s", snap.combo.max_streak, snap.now_ms / 1_000);
    for event in &snap.feed {
        println!("  - {}", event.message);
    }
    if let Some(best) = scores.top_score() {
        println!("  leaderboard best: {}", best);
    }
}
