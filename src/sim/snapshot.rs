//! Read-only views for the rendering layer

use glam::IVec2;
use serde::Serialize;

use super::flow::{FlowMode, FlowNode};
use super::kinds::{Infusion, Meter, RockKind};
use super::match_grid::Tile;
use super::pieces::{PIECE_CELLS, PendingPiece, Piece};
use super::state::{GameEvent, GameState, RunPhase};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub score: u64,
    pub lines_cleared: u32,
    pub circuits_completed: u32,
    pub integrity: f32,
    pub game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComboSnapshot {
    pub streak: u32,
    pub multiplier: f32,
    pub max_streak: u32,
    pub decay_remaining_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSnapshot {
    pub kind: RockKind,
    pub rotation: u8,
    pub origin: IVec2,
    pub cells: [IVec2; PIECE_CELLS],
}

impl From<Piece> for ActiveSnapshot {
    fn from(value: Piece) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            origin: value.origin,
            cells: value.cells(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchematicSnapshot {
    pub id: u32,
    pub label: &'static str,
    pub kind: RockKind,
    pub cells: Vec<IVec2>,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSnapshot {
    pub cells: Vec<usize>,
    pub valid: bool,
}

/// Everything a frame needs to draw, copied out of the state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub now_ms: u64,
    pub run: RunSnapshot,
    pub meters: [(Meter, u32); 4],
    pub combo: ComboSnapshot,

    pub match_board: Vec<Vec<Option<Tile>>>,
    pub selected: Option<IVec2>,
    pub empower_mode: bool,
    pub match_resolving: bool,
    pub match_settle_ms: u64,
    pub pending_infusions: Vec<Infusion>,

    pub stack_board: Vec<Vec<Option<RockKind>>>,
    pub active: Option<ActiveSnapshot>,
    pub marked_rows: Vec<i32>,
    pub pending_pieces: Vec<PendingPiece>,
    pub drop_interval_ms: u64,
    pub next_drop_ms: u64,

    pub flow_nodes: Vec<FlowNode>,
    pub flow_mode: FlowMode,
    pub route_selection: Vec<usize>,
    pub preview: Option<PreviewSnapshot>,
    pub schematics: Vec<SchematicSnapshot>,
    pub stabilize_cooldown_ms: u64,

    pub feed: Vec<GameEvent>,
}

impl GameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let now = state.now();
        Self {
            now_ms: now,
            run: RunSnapshot {
                phase: state.phase,
                score: state.run.score,
                lines_cleared: state.run.lines_cleared,
                circuits_completed: state.run.circuits_completed,
                integrity: state.integrity.value(),
                game_over: state.is_game_over(),
            },
            meters: state.economy.levels(),
            combo: ComboSnapshot {
                streak: state.combo.streak,
                multiplier: state.combo.multiplier,
                max_streak: state.combo.max_streak,
                decay_remaining_ms: state.combo.decay_remaining(now),
            },

            match_board: state.match_grid.rows().map(<[_]>::to_vec).collect(),
            selected: state.match_grid.selected,
            empower_mode: state.empower_mode,
            match_resolving: state.match_grid.is_resolving(),
            match_settle_ms: state.match_grid.settle_remaining(now),
            pending_infusions: state.pending_infusions.clone(),

            stack_board: state.stack.rows().map(<[_]>::to_vec).collect(),
            active: state.stack.active.map(ActiveSnapshot::from),
            marked_rows: state.stack.marked_rows().to_vec(),
            pending_pieces: state.stack.queue.iter().copied().collect(),
            drop_interval_ms: state.stack.drop_interval_ms,
            next_drop_ms: state.stack.gravity_remaining(now),

            flow_nodes: state.flow.nodes().to_vec(),
            flow_mode: state.flow.mode,
            route_selection: state.flow.selection().iter().copied().collect(),
            preview: state.flow.preview().map(|p| PreviewSnapshot {
                cells: p.cells.clone(),
                valid: p.valid,
            }),
            schematics: state
                .schematics
                .iter()
                .map(|s| SchematicSnapshot {
                    id: s.id,
                    label: s.label(),
                    kind: s.kind,
                    cells: s.cells.clone(),
                    width: s.width,
                    height: s.height,
                })
                .collect(),
            stabilize_cooldown_ms: state.flow.cooldown_remaining(now),

            feed: state.feed.iter().cloned().collect(),
        }
    }

    pub fn playable(&self) -> bool {
        !self.run.game_over
    }

    /// Stack board with the active piece drawn in
    pub fn stack_with_active(&self) -> Vec<Vec<Option<RockKind>>> {
        let mut board = self.stack_board.clone();
        if let Some(active) = &self.active {
            for cell in active.cells {
                // Cells above the board are not drawn
                if cell.x < 0 || cell.y < 0 {
                    continue;
                }
                if let Some(slot) = board
                    .get_mut(cell.y as usize)
                    .and_then(|row| row.get_mut(cell.x as usize))
                {
                    *slot = Some(active.kind);
                }
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{MATCH_SIZE, STACK_HEIGHT, STACK_WIDTH};

    #[test]
    fn test_capture_dimensions() {
        let state = GameState::new(4);
        let snap = GameSnapshot::capture(&state);
        assert_eq!(snap.match_board.len(), MATCH_SIZE as usize);
        assert!(snap.match_board.iter().all(|r| r.iter().all(Option::is_some)));
        assert_eq!(snap.stack_board.len(), STACK_HEIGHT as usize);
        assert_eq!(snap.stack_board[0].len(), STACK_WIDTH as usize);
        assert!(snap.playable());
    }

    #[test]
    fn test_active_piece_projection() {
        let mut state = GameState::new(4);
        state.stack.enqueue(RockKind::Crystal, 0);
        state.spawn_if_idle();
        let snap = GameSnapshot::capture(&state);
        let drawn = snap.stack_with_active();
        let filled = drawn.iter().flatten().filter(|c| c.is_some()).count();
        assert_eq!(filled, PIECE_CELLS);
        assert_eq!(snap.next_drop_ms, state.stack.drop_interval_ms);
    }

    #[test]
    fn test_timers_count_down_in_snapshot() {
        let mut state = GameState::new(4);
        state.match_grid.begin_settle(0, 250);
        state.stack.enqueue(RockKind::Crystal, 0);
        state.spawn_if_idle();
        state.clock.advance(100);
        let snap = GameSnapshot::capture(&state);
        assert_eq!(snap.match_settle_ms, 150);
        assert_eq!(snap.next_drop_ms, state.stack.drop_interval_ms - 100);
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = GameState::new(4);
        let json = serde_json::to_string(&GameSnapshot::capture(&state)).unwrap();
        assert!(json.contains("\"flow_nodes\""));
    }
}
