//! Deterministic simulation module
//!
//! All reactor logic lives here. This module must be pure and deterministic:
//! - Millisecond clock advanced only by `tick`
//! - Seeded RNG only
//! - Stable iteration order (row-major cells, ordered maps)
//! - No rendering or platform dependencies

pub mod clock;
pub mod combo;
pub mod economy;
pub mod flow;
pub mod integrity;
pub mod kinds;
pub mod match_grid;
pub mod piece_stack;
pub mod pieces;
pub mod rejection;
mod routing;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use clock::{Clock, Deadline};
pub use combo::{BreakReason, ComboEngine, ComboSource};
pub use economy::Economy;
pub use flow::{FlowMode, FlowNetwork, FlowNode, NodeKind, Schematic, SchematicQueue};
pub use integrity::{DamageReason, IntegrityModel, RestoreReason};
pub use kinds::{Infusion, Meter, RockKind};
pub use match_grid::{MatchGrid, MatchReport, Tile};
pub use piece_stack::{LockReport, PieceStack, StackPhase};
pub use pieces::{Piece, RotateDir};
pub use rejection::Rejection;
pub use snapshot::GameSnapshot;
pub use state::{EventFeed, GameEvent, GameState, RunPhase, RunState};
pub use tick::{Intent, TickInput, apply_intent, tick};
