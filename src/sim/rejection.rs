//! Expected, non-fatal refusals
//!
//! Every player intent that cannot be honoured returns one of these and leaves
//! the state untouched. They are surfaced to the player through the event feed.

use thiserror::Error;

use super::kinds::Meter;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejection {
    #[error("the reactor has gone critical; restart to continue")]
    GameOver,

    #[error("cell ({x}, {y}) is outside the board")]
    OutOfBounds { x: i32, y: i32 },
    #[error("only neighbouring rocks can trade places")]
    NotAdjacent,
    #[error("that swap forms no run")]
    NoRun,
    #[error("the rock board is still settling")]
    MatchResolving,
    #[error("this rock already carries a charged state")]
    AlreadyEmpowered,
    #[error("not enough {meter:?} energy: need {needed}, have {available}")]
    InsufficientFunds {
        meter: Meter,
        needed: u32,
        available: u32,
    },

    #[error("no piece is falling")]
    NoActivePiece,
    #[error("the reactor stack is clearing lines")]
    StackResolving,
    #[error("the piece is blocked")]
    Blocked,
    #[error("no rotation fits here")]
    RotationBlocked,

    #[error("flow node {index} does not exist")]
    NoSuchNode { index: usize },
    #[error("no schematics ready; clear reactor lines to craft more")]
    NoSchematic,
    #[error("the schematic does not fit inside the lattice")]
    PlacementOutOfBounds,
    #[error("the schematic overlaps an occupied node")]
    PlacementOverlap,
    #[error("route planning is not active")]
    RouteModeInactive,
    #[error("route needs {required} locked nodes, only {locked} selected")]
    TooFewLockedNodes { locked: usize, required: usize },
    #[error("route stabilizers recharging for {remaining_ms} ms")]
    StabilizeCooldown { remaining_ms: u64 },

    #[error("shift meter at {level}, needs {required}")]
    ShiftNotCharged { level: u32, required: u32 },
}

impl Rejection {
    /// Short machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::GameOver => "game_over",
            Rejection::OutOfBounds { .. } => "out_of_bounds",
            Rejection::NotAdjacent => "not_adjacent",
            Rejection::NoRun => "no_run",
            Rejection::MatchResolving => "match_resolving",
            Rejection::AlreadyEmpowered => "already_empowered",
            Rejection::InsufficientFunds { .. } => "insufficient_funds",
            Rejection::NoActivePiece => "no_active_piece",
            Rejection::StackResolving => "stack_resolving",
            Rejection::Blocked => "blocked",
            Rejection::RotationBlocked => "rotation_blocked",
            Rejection::NoSuchNode { .. } => "no_such_node",
            Rejection::NoSchematic => "no_schematic",
            Rejection::PlacementOutOfBounds => "placement_out_of_bounds",
            Rejection::PlacementOverlap => "placement_overlap",
            Rejection::RouteModeInactive => "route_mode_inactive",
            Rejection::TooFewLockedNodes { .. } => "too_few_locked_nodes",
            Rejection::StabilizeCooldown { .. } => "stabilize_cooldown",
            Rejection::ShiftNotCharged { .. } => "shift_not_charged",
        }
    }
}
