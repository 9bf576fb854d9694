//! Rock Reactor - a hybrid match / stack / flow puzzle engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grids, economy, combo, integrity, orchestration)
//! - `audio`: Named sound cues handed to the host's audio player
//! - `highscores`: Run reporting and the persisted leaderboard
//! - `settings`: Runtime configuration

pub mod audio;
pub mod highscores;
pub mod settings;
pub mod sim;

pub use audio::{AudioCue, CueSink};
pub use highscores::{HighScores, RunMeta, RunReporter};
pub use settings::Settings;

use glam::IVec2;

/// Game configuration constants
pub mod consts {
    /// Side length of the square match board
    pub const MATCH_SIZE: i32 = 6;
    /// Minimum run length that resolves
    pub const MIN_RUN: usize = 3;
    /// Resample attempts per cell before falling back to a deterministic kind
    pub const MAX_RESAMPLE_ATTEMPTS: u32 = 16;

    /// Piece stack dimensions
    pub const STACK_WIDTH: i32 = 10;
    pub const STACK_HEIGHT: i32 = 20;
    /// Spawn column/row of a new piece's mask origin
    pub const SPAWN_X: i32 = 3;
    pub const SPAWN_Y: i32 = 0;

    /// Side length of the square flow network
    pub const FLOW_SIZE: i32 = 6;
    /// Node indices seeded as wells / conduits at network init
    pub const WELL_NODES: [usize; 3] = [2, 7, 28];
    pub const CONDUIT_NODES: [usize; 3] = [9, 26, 33];

    /// Meter bounds
    pub const METER_MAX: u32 = 100;
    /// Empower costs
    pub const EMPOWER_EARTH_COST: u32 = 20;
    pub const EMPOWER_WATER_COST: u32 = 30;
    /// Shift credited after a successful empower
    pub const EMPOWER_SHIFT_BONUS: u32 = 16;
    /// Shift meter level required to actuate
    pub const SHIFT_THRESHOLD: u32 = 100;

    /// Match credits
    pub const MATCH_CREDIT_PER_TILE: u32 = 8;
    pub const MATCH_CREDIT_PER_EMPOWERED: u32 = 12;
    /// Tiles (plus empowered tiles) per bonus piece
    pub const TILES_PER_BONUS_PIECE: u32 = 4;
    /// Line clear credit per row
    pub const LINE_CREDIT_PER_ROW: u32 = 14;
    /// Circuit credits
    pub const CIRCUIT_CREDIT: u32 = 20;
    pub const CIRCUIT_FIRE_CREDIT: u32 = 10;

    /// Integrity bounds and costs
    pub const INTEGRITY_MAX: f32 = 100.0;
    pub const PASSIVE_STEP_COST: f32 = 0.05;
    pub const EMPTY_LOCK_PENALTY: f32 = 6.0;
    pub const LINE_RESTORE_PER_ROW: f32 = 8.0;
    pub const CIRCUIT_RESTORE: f32 = 10.0;
    pub const STABILIZE_RESTORE_PER_NODE: f32 = 2.0;
    /// Locked nodes a route needs before it can be stabilized
    pub const STABILIZE_MIN_LOCKED: usize = 3;

    /// Combo multiplier curve
    pub const COMBO_STEP: f32 = 0.25;
    pub const COMBO_MAX_MULTIPLIER: f32 = 3.5;

    /// Scores
    pub const SCORE_PER_TILE: u64 = 10;
    pub const SCORE_PER_EMPOWERED: u64 = 15;
    pub const LINE_SCORES: [u64; 5] = [0, 100, 300, 500, 800];
    pub const CIRCUIT_SCORE: u64 = 250;

    /// Timings (milliseconds)
    pub const INITIAL_DROP_MS: u64 = 900;
    pub const SHIFT_DROP_REDUCTION_MS: u64 = 80;
    pub const MIN_DROP_MS: u64 = 400;
    pub const MATCH_SETTLE_MS: u64 = 250;
    pub const LINE_SETTLE_MS: u64 = 180;
    pub const COMBO_DECAY_MS: u64 = 4_000;
    pub const STABILIZE_COOLDOWN_MS: u64 = 10_000;
    pub const PREVIEW_MS: u64 = 900;

    /// User-facing event feed length
    pub const EVENT_FEED_CAPACITY: usize = 8;
}

/// Four orthogonal neighbour offsets
pub const NEIGHBOURS_4: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Convert a row-major index into a cell on a square grid of side `size`
#[inline]
pub fn index_to_cell(index: usize, size: i32) -> IVec2 {
    let size = size as usize;
    IVec2::new((index % size) as i32, (index / size) as i32)
}

/// Convert a cell into a row-major index on a square grid of side `size`
#[inline]
pub fn cell_to_index(cell: IVec2, size: i32) -> Option<usize> {
    if cell.x < 0 || cell.y < 0 || cell.x >= size || cell.y >= size {
        return None;
    }
    Some((cell.y * size + cell.x) as usize)
}

/// True when two cells share an edge
#[inline]
pub fn are_adjacent(a: IVec2, b: IVec2) -> bool {
    let d = (a - b).abs();
    d.x + d.y == 1
}
