//! Falling-piece stack: gravity, collision, locking and row clears
//!
//! The board is `STACK_HEIGHT` rows of `STACK_WIDTH` columns, `y = 0` at the
//! top. Cells above the board (`y < 0`) are open space; the sides and floor
//! are walls.

use std::collections::VecDeque;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::clock::Deadline;
use super::kinds::RockKind;
use super::pieces::{PendingPiece, Piece, RotateDir, try_rotate};
use super::rejection::Rejection;
use crate::consts::{INITIAL_DROP_MS, SPAWN_X, SPAWN_Y, STACK_HEIGHT, STACK_WIDTH};

/// Stack sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackPhase {
    /// No piece falling; the next queued piece may spawn
    Idle,
    /// A piece is falling under gravity and input
    PieceActive,
    /// The active piece is being written into the board
    Locking,
    /// Full rows are marked and wait out the settle window
    ResolvingLines,
}

/// Inputs to the stack phase table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEvent {
    Spawn,
    Lock,
    RowsFound,
    NoRows,
    Settled,
    Reset,
}

impl StackPhase {
    /// Transition table; `None` means the event is not valid in this phase
    pub fn next(self, event: StackEvent) -> Option<StackPhase> {
        use StackEvent as E;
        use StackPhase as P;
        match (self, event) {
            (_, E::Reset) => Some(P::Idle),
            (P::Idle, E::Spawn) => Some(P::PieceActive),
            (P::PieceActive, E::Lock) => Some(P::Locking),
            (P::Locking, E::RowsFound) => Some(P::ResolvingLines),
            (P::Locking, E::NoRows) => Some(P::Idle),
            (P::ResolvingLines, E::Settled) => Some(P::Idle),
            _ => None,
        }
    }
}

/// What a lock produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReport {
    pub kind: RockKind,
    pub rotation: u8,
    /// Full rows found at lock time, top to bottom
    pub rows: Vec<i32>,
}

impl LockReport {
    pub fn cleared(&self) -> usize {
        self.rows.len()
    }
}

/// Result of a single downward step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Locked(LockReport),
}

/// Result of trying to bring in the next piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(Piece),
    /// Queue empty or stack busy
    Nothing,
    /// The spawn position is already occupied
    Overflow(RockKind),
}

/// Everything that happened to the stack during one `update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTick {
    /// Rows gravity moved the piece down
    pub steps: u32,
    pub locked: Option<LockReport>,
    /// Rows spliced out when the settle window closed
    pub spliced: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceStack {
    /// Row-major locked cells (y * STACK_WIDTH + x)
    cells: Vec<Option<RockKind>>,
    pub queue: VecDeque<PendingPiece>,
    pub active: Option<Piece>,
    pub phase: StackPhase,
    marked_rows: Vec<i32>,
    settle: Deadline,
    gravity: Deadline,
    pub drop_interval_ms: u64,
}

impl Default for PieceStack {
    fn default() -> Self {
        Self::new(INITIAL_DROP_MS)
    }
}

impl PieceStack {
    pub fn new(drop_interval_ms: u64) -> Self {
        Self {
            cells: vec![None; (STACK_WIDTH * STACK_HEIGHT) as usize],
            queue: VecDeque::new(),
            active: None,
            phase: StackPhase::Idle,
            marked_rows: Vec::new(),
            settle: Deadline::IDLE,
            gravity: Deadline::IDLE,
            drop_interval_ms,
        }
    }

    #[inline]
    fn index(cell: IVec2) -> Option<usize> {
        if cell.x < 0 || cell.x >= STACK_WIDTH || cell.y < 0 || cell.y >= STACK_HEIGHT {
            return None;
        }
        Some((cell.y * STACK_WIDTH + cell.x) as usize)
    }

    /// Locked cell at (x, y); `None` for empty or out of bounds
    pub fn get(&self, cell: IVec2) -> Option<RockKind> {
        Self::index(cell).and_then(|i| self.cells[i])
    }

    /// Set a locked cell directly (board setup)
    pub fn set(&mut self, cell: IVec2, kind: Option<RockKind>) -> bool {
        match Self::index(cell) {
            Some(i) => {
                self.cells[i] = kind;
                true
            }
            None => false,
        }
    }

    /// Within the walls and not overlapping a locked cell
    pub fn is_free(&self, cell: IVec2) -> bool {
        if cell.x < 0 || cell.x >= STACK_WIDTH || cell.y >= STACK_HEIGHT {
            return false;
        }
        cell.y < 0 || self.get(cell).is_none()
    }

    pub fn collides(&self, piece: &Piece) -> bool {
        piece.cells().iter().any(|&c| !self.is_free(c))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<RockKind>]> {
        self.cells.chunks(STACK_WIDTH as usize)
    }

    pub fn marked_rows(&self) -> &[i32] {
        &self.marked_rows
    }

    pub fn is_row_full(&self, y: i32) -> bool {
        (0..STACK_WIDTH).all(|x| self.get(IVec2::new(x, y)).is_some())
    }

    fn transition(&mut self, event: StackEvent) {
        match self.phase.next(event) {
            Some(next) => self.phase = next,
            None => log::warn!("stack ignored {:?} while {:?}", event, self.phase),
        }
    }

    pub fn enqueue(&mut self, kind: RockKind, rotation: u8) {
        self.queue.push_back(PendingPiece { kind, rotation });
    }

    /// Bring in the next queued piece if the stack is idle
    pub fn spawn_next(&mut self, now: u64) -> SpawnOutcome {
        if self.phase != StackPhase::Idle || self.active.is_some() {
            return SpawnOutcome::Nothing;
        }
        let Some(next) = self.queue.pop_front() else {
            return SpawnOutcome::Nothing;
        };
        let piece = Piece::new(next.kind, next.rotation, IVec2::new(SPAWN_X, SPAWN_Y));
        if self.collides(&piece) {
            log::info!("spawn of {:?} blocked: stack overflow", next.kind);
            return SpawnOutcome::Overflow(next.kind);
        }
        self.active = Some(piece);
        self.transition(StackEvent::Spawn);
        self.gravity.arm(now, self.drop_interval_ms);
        SpawnOutcome::Spawned(piece)
    }

    fn active_piece(&self) -> Result<Piece, Rejection> {
        match (self.phase, self.active) {
            (StackPhase::PieceActive, Some(piece)) => Ok(piece),
            (StackPhase::ResolvingLines, _) => Err(Rejection::StackResolving),
            _ => Err(Rejection::NoActivePiece),
        }
    }

    pub fn move_by(&mut self, dx: i32) -> Result<(), Rejection> {
        let piece = self.active_piece()?;
        let moved = piece.shifted(IVec2::new(dx, 0));
        if self.collides(&moved) {
            return Err(Rejection::Blocked);
        }
        self.active = Some(moved);
        Ok(())
    }

    /// Rotate with kicks; returns the kick that fit
    pub fn rotate(&mut self, dir: RotateDir) -> Result<IVec2, Rejection> {
        let piece = self.active_piece()?;
        let (rotated, kick) =
            try_rotate(&piece, dir, |c| self.is_free(c)).ok_or(Rejection::RotationBlocked)?;
        self.active = Some(rotated);
        Ok(kick)
    }

    /// Move down one row, or lock if the row below is blocked
    fn step_down(&mut self, piece: Piece, now: u64) -> StepOutcome {
        let lowered = piece.shifted(IVec2::Y);
        if self.collides(&lowered) {
            StepOutcome::Locked(self.lock(now))
        } else {
            self.active = Some(lowered);
            self.gravity.arm(now, self.drop_interval_ms);
            StepOutcome::Moved
        }
    }

    pub fn soft_drop(&mut self, now: u64) -> Result<StepOutcome, Rejection> {
        let piece = self.active_piece()?;
        Ok(self.step_down(piece, now))
    }

    /// Drop straight down and lock. Returns the rows travelled and the lock.
    pub fn hard_drop(&mut self, now: u64) -> Result<(u32, LockReport), Rejection> {
        let mut piece = self.active_piece()?;
        let mut rows = 0;
        while !self.collides(&piece.shifted(IVec2::Y)) {
            piece = piece.shifted(IVec2::Y);
            rows += 1;
        }
        self.active = Some(piece);
        Ok((rows, self.lock(now)))
    }

    /// Write the active piece into the board and mark full rows. Rows are
    /// spliced out when the settle window closes.
    fn lock(&mut self, now: u64) -> LockReport {
        self.transition(StackEvent::Lock);
        self.gravity.cancel();
        let Some(piece) = self.active.take() else {
            self.transition(StackEvent::NoRows);
            return LockReport {
                kind: RockKind::Sedimentary,
                rotation: 0,
                rows: Vec::new(),
            };
        };
        for cell in piece.cells() {
            self.set(cell, Some(piece.kind));
        }

        let rows: Vec<i32> = (0..STACK_HEIGHT).filter(|&y| self.is_row_full(y)).collect();
        if rows.is_empty() {
            self.transition(StackEvent::NoRows);
        } else {
            self.marked_rows = rows.clone();
            self.settle.arm(now, crate::consts::LINE_SETTLE_MS);
            self.transition(StackEvent::RowsFound);
        }
        log::debug!(
            "locked {:?} r{} at {:?}, {} full rows",
            piece.kind,
            piece.rotation,
            piece.origin,
            rows.len()
        );
        LockReport {
            kind: piece.kind,
            rotation: piece.rotation,
            rows,
        }
    }

    /// Remove marked rows and prepend empty rows at the top
    fn splice_marked(&mut self) -> usize {
        let width = STACK_WIDTH as usize;
        let marked = std::mem::take(&mut self.marked_rows);
        let kept: Vec<Option<RockKind>> = self
            .cells
            .chunks(width)
            .enumerate()
            .filter(|(y, _)| !marked.contains(&(*y as i32)))
            .flat_map(|(_, row)| row.iter().copied())
            .collect();
        let mut cells = vec![None; marked.len() * width];
        cells.extend(kept);
        self.cells = cells;
        marked.len()
    }

    /// Advance gravity and the settle window
    pub fn update(&mut self, now: u64) -> StackTick {
        let mut out = StackTick::default();

        if self.phase == StackPhase::ResolvingLines && self.settle.take_due(now) {
            out.spliced = self.splice_marked();
            self.transition(StackEvent::Settled);
        }

        // Catch up on every interval that elapsed, each timed from the last
        while self.phase == StackPhase::PieceActive {
            let Some(due_at) = self.gravity.ready_at().filter(|&at| now >= at) else {
                break;
            };
            let Some(piece) = self.active else {
                break;
            };
            match self.step_down(piece, due_at) {
                StepOutcome::Moved => out.steps += 1,
                StepOutcome::Locked(report) => {
                    out.locked = Some(report);
                    break;
                }
            }
        }
        out
    }

    /// Permanently shorten the gravity interval
    pub fn speed_up(&mut self, reduction_ms: u64, floor_ms: u64) -> u64 {
        self.drop_interval_ms = self.drop_interval_ms.saturating_sub(reduction_ms).max(floor_ms);
        self.drop_interval_ms
    }

    /// Stop gravity and settle timers (run ended)
    pub fn halt(&mut self) {
        self.gravity.cancel();
        self.settle.cancel();
    }

    pub fn gravity_remaining(&self, now: u64) -> u64 {
        self.gravity.remaining(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::LINE_SETTLE_MS;

    /// Fill row `y` except the listed columns
    fn fill_row_except(stack: &mut PieceStack, y: i32, gaps: &[i32]) {
        for x in 0..STACK_WIDTH {
            if !gaps.contains(&x) {
                stack.set(IVec2::new(x, y), Some(RockKind::Igneous));
            }
        }
    }

    #[test]
    fn test_phase_table() {
        assert_eq!(StackPhase::Idle.next(StackEvent::Spawn), Some(StackPhase::PieceActive));
        assert_eq!(StackPhase::Idle.next(StackEvent::Lock), None);
        assert_eq!(
            StackPhase::Locking.next(StackEvent::RowsFound),
            Some(StackPhase::ResolvingLines)
        );
        assert_eq!(StackPhase::ResolvingLines.next(StackEvent::Spawn), None);
        assert_eq!(StackPhase::ResolvingLines.next(StackEvent::Reset), Some(StackPhase::Idle));
    }

    #[test]
    fn test_spawn_and_gravity() {
        let mut stack = PieceStack::new(100);
        stack.enqueue(RockKind::Crystal, 0);
        assert!(matches!(stack.spawn_next(0), SpawnOutcome::Spawned(_)));
        assert_eq!(stack.phase, StackPhase::PieceActive);

        assert_eq!(stack.update(99).steps, 0);
        assert_eq!(stack.update(100).steps, 1);
        assert_eq!(stack.active.unwrap().origin, IVec2::new(SPAWN_X, SPAWN_Y + 1));
        assert_eq!(stack.gravity_remaining(150), 50);
    }

    #[test]
    fn test_late_update_catches_up_on_gravity() {
        let mut stack = PieceStack::new(900);
        stack.enqueue(RockKind::Crystal, 0);
        stack.spawn_next(0);

        let tick = stack.update(2_000);
        assert_eq!(tick.steps, 2);
        assert_eq!(stack.active.unwrap().origin, IVec2::new(SPAWN_X, SPAWN_Y + 2));
        // Next step stays on the original cadence
        assert_eq!(stack.gravity_remaining(2_000), 700);
    }

    #[test]
    fn test_late_update_stops_at_lock() {
        let mut stack = PieceStack::new(100);
        stack.enqueue(RockKind::Crystal, 0);
        stack.spawn_next(0);

        let tick = stack.update(60_000);
        assert_eq!(tick.steps, (STACK_HEIGHT - 2) as u32);
        assert!(tick.locked.is_some());
        assert!(stack.active.is_none());
        assert_eq!(stack.phase, StackPhase::Idle);
    }

    #[test]
    fn test_spawn_overflow() {
        let mut stack = PieceStack::default();
        stack.set(IVec2::new(SPAWN_X + 1, SPAWN_Y), Some(RockKind::Igneous));
        stack.enqueue(RockKind::Crystal, 0);
        assert_eq!(stack.spawn_next(0), SpawnOutcome::Overflow(RockKind::Crystal));
        assert!(stack.active.is_none());
    }

    #[test]
    fn test_move_blocked_by_wall() {
        let mut stack = PieceStack::default();
        stack.enqueue(RockKind::Crystal, 0);
        stack.spawn_next(0);
        // Crystal occupies mask columns 1..=2; origin x may go to -1
        for _ in 0..4 {
            stack.move_by(-1).unwrap();
        }
        assert_eq!(stack.move_by(-1), Err(Rejection::Blocked));
        assert_eq!(stack.active.unwrap().origin.x, -1);
    }

    #[test]
    fn test_hard_drop_locks_on_floor() {
        let mut stack = PieceStack::default();
        stack.enqueue(RockKind::Crystal, 0);
        stack.spawn_next(0);
        let (rows, report) = stack.hard_drop(0).unwrap();
        assert_eq!(rows, (STACK_HEIGHT - 2) as u32);
        assert!(report.rows.is_empty());
        assert_eq!(stack.phase, StackPhase::Idle);
        assert_eq!(stack.get(IVec2::new(SPAWN_X + 1, STACK_HEIGHT - 1)), Some(RockKind::Crystal));
    }

    #[test]
    fn test_line_clear_settles_then_splices() {
        let mut stack = PieceStack::default();
        let bottom = STACK_HEIGHT - 1;
        fill_row_except(&mut stack, bottom, &[4, 5]);
        fill_row_except(&mut stack, bottom - 1, &[4, 5]);
        stack.set(IVec2::new(0, bottom - 2), Some(RockKind::Metamorphic));

        stack.enqueue(RockKind::Crystal, 0);
        stack.spawn_next(0);
        let (_, report) = stack.hard_drop(10).unwrap();
        assert_eq!(report.rows, vec![bottom - 1, bottom]);
        assert_eq!(stack.phase, StackPhase::ResolvingLines);
        assert_eq!(stack.move_by(1), Err(Rejection::StackResolving));

        let tick = stack.update(10 + LINE_SETTLE_MS);
        assert_eq!(tick.spliced, 2);
        assert_eq!(stack.phase, StackPhase::Idle);
        // The stray cell above the cleared rows fell to the floor
        assert_eq!(stack.get(IVec2::new(0, bottom)), Some(RockKind::Metamorphic));
        assert!((0..STACK_WIDTH).all(|x| stack.get(IVec2::new(x, 0)).is_none()));
    }

    #[test]
    fn test_rotate_rejected_leaves_piece_unchanged() {
        let mut stack = PieceStack::default();
        stack.enqueue(RockKind::Sedimentary, 0);
        stack.spawn_next(0);
        let before = stack.active.unwrap();
        // Box the piece in so no kick fits
        for y in 0..6 {
            for x in 0..STACK_WIDTH {
                let c = IVec2::new(x, y);
                if !before.cells().contains(&c) {
                    stack.set(c, Some(RockKind::Igneous));
                }
            }
        }
        assert_eq!(stack.rotate(RotateDir::Cw), Err(Rejection::RotationBlocked));
        assert_eq!(stack.active.unwrap(), before);
    }

    #[test]
    fn test_speed_up_floors() {
        let mut stack = PieceStack::new(450);
        assert_eq!(stack.speed_up(80, 400), 400);
        assert_eq!(stack.speed_up(80, 400), 400);
    }
}
