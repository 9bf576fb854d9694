//! Cross-component routing
//!
//! Matches feed the stack and the meters, row clears feed the schematic
//! queue, and completed circuits feed infusions back onto the match board.
//! Each intent handler either commits fully or returns a [`Rejection`] with
//! nothing changed.

use glam::IVec2;

use super::combo::{BreakReason, ComboSource};
use super::flow::{NodeAction, Placement};
use super::integrity::{DamageReason, RestoreReason};
use super::kinds::{Infusion, Meter, RockKind};
use super::match_grid::{MatchGrid, MatchReport};
use super::piece_stack::{LockReport, SpawnOutcome, StepOutcome};
use super::pieces::RotateDir;
use super::rejection::Rejection;
use super::state::GameState;
use crate::are_adjacent;
use crate::audio::AudioCue;
use crate::consts::*;

/// Empower spend, all-or-nothing
const EMPOWER_COSTS: [(Meter, u32); 2] = [
    (Meter::Earth, EMPOWER_EARTH_COST),
    (Meter::Water, EMPOWER_WATER_COST),
];

impl GameState {
    // === Match board ===

    /// Select a match cell. In empower mode this empowers the tile instead.
    /// Selecting the selected cell clears it, a distant cell moves the
    /// selection, and a neighbour attempts the swap.
    pub fn select_cell(&mut self, cell: IVec2) -> Result<(), Rejection> {
        self.ensure_playing()?;
        if !MatchGrid::in_bounds(cell) {
            return Err(Rejection::OutOfBounds {
                x: cell.x,
                y: cell.y,
            });
        }
        if self.empower_mode {
            return self.empower_cell(cell);
        }

        match self.match_grid.selected {
            None => self.match_grid.selected = Some(cell),
            Some(sel) if sel == cell => self.match_grid.selected = None,
            Some(sel) if !are_adjacent(sel, cell) => self.match_grid.selected = Some(cell),
            Some(sel) => return self.swap(sel, cell),
        }
        Ok(())
    }

    fn swap(&mut self, a: IVec2, b: IVec2) -> Result<(), Rejection> {
        let now = self.now();
        match self.match_grid.try_swap(a, b, &mut self.rng) {
            Ok(report) => {
                self.match_grid.selected = None;
                self.on_match(report, now);
                Ok(())
            }
            Err(Rejection::NoRun) => {
                self.match_grid.selected = None;
                self.cue(AudioCue::Dud);
                self.break_combo(BreakReason::Dud);
                Err(Rejection::NoRun)
            }
            Err(other) => Err(other),
        }
    }

    fn on_match(&mut self, report: MatchReport, now: u64) {
        self.combo.register(1, ComboSource::Match, now);
        let base = report.total_tiles() as u64 * SCORE_PER_TILE
            + report.total_empowered() as u64 * SCORE_PER_EMPOWERED;
        let awarded = self.combo.award(base, true);
        self.run.score += awarded;

        for (&kind, tally) in &report.kinds {
            let credit = MATCH_CREDIT_PER_TILE * tally.count
                + MATCH_CREDIT_PER_EMPOWERED * tally.empowered;
            self.economy.credit(kind.meter(), credit);
            let pieces = 1 + (tally.count + tally.empowered) / TILES_PER_BONUS_PIECE;
            for _ in 0..pieces {
                self.stack.enqueue(kind, 0);
            }
        }
        self.apply_infusion_rewards(&report);

        self.match_grid.begin_settle(now, MATCH_SETTLE_MS);
        self.cue(AudioCue::Match);
        self.note(format!(
            "Matched {} rocks for {} points.",
            report.total_tiles(),
            awarded
        ));
        self.apply_pending_infusions();
    }

    /// Bonuses for infused tiles caught in a match
    fn apply_infusion_rewards(&mut self, report: &MatchReport) {
        for (&infusion, &n) in &report.infusions {
            match infusion {
                Infusion::Volcanic => {
                    self.economy.credit(Meter::Fire, 14 * n);
                    for _ in 0..n {
                        self.stack.enqueue(RockKind::Igneous, 0);
                    }
                }
                Infusion::Flux => {
                    self.economy.credit(Meter::Water, 10 * n);
                    self.economy.credit(Meter::Shift, 12 * n);
                }
                Infusion::Prismatic => {
                    for meter in [Meter::Earth, Meter::Fire, Meter::Water] {
                        self.economy.credit(meter, 6 * n);
                    }
                    self.economy.credit(Meter::Shift, 10 * n);
                }
                // Anchors are placed by the board itself during refill
                Infusion::Geolocked => {}
            }
            self.note(format!("{} x{} released its charge.", infusion.as_str(), n));
        }
        if report.anchors_reinforced > 0 {
            self.note(format!(
                "Geolocked anchors reinforced {} column(s).",
                report.anchors_reinforced
            ));
        }
    }

    /// Try every waiting infusion once; the ones that find no tile stay queued
    pub(crate) fn apply_pending_infusions(&mut self) {
        if self.pending_infusions.is_empty() {
            return;
        }
        let waiting = std::mem::take(&mut self.pending_infusions);
        for infusion in waiting {
            match self.match_grid.apply_infusion(infusion, &mut self.rng) {
                Some(cell) => {
                    self.cue(AudioCue::Infusion);
                    self.note(format!(
                        "Infused the rock at ({}, {}) with {} energy.",
                        cell.x,
                        cell.y,
                        infusion.as_str()
                    ));
                }
                None => self.pending_infusions.push(infusion),
            }
        }
    }

    pub fn toggle_empower_mode(&mut self) -> Result<bool, Rejection> {
        self.ensure_playing()?;
        if self.empower_mode {
            self.empower_mode = false;
        } else {
            self.economy.can_afford(&EMPOWER_COSTS)?;
            self.empower_mode = true;
        }
        Ok(self.empower_mode)
    }

    fn empower_cell(&mut self, cell: IVec2) -> Result<(), Rejection> {
        self.match_grid.check_empower(cell)?;
        self.economy.debit_all(&EMPOWER_COSTS)?;
        let kind = self.match_grid.empower(cell)?;
        self.economy.credit(Meter::Shift, EMPOWER_SHIFT_BONUS);
        self.empower_mode = false;
        self.cue(AudioCue::Empower);
        self.note(format!("Empowered a {} rock.", kind.as_str()));
        Ok(())
    }

    fn break_combo(&mut self, reason: BreakReason) {
        if let Some(lost) = self.combo.break_streak(reason) {
            self.cue(AudioCue::ComboBreak);
            self.note(format!("Combo of {} lost.", lost));
        }
    }

    // === Piece stack ===

    pub fn move_piece(&mut self, dx: i32) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.stack.move_by(dx)
    }

    pub fn rotate_piece(&mut self, dir: RotateDir) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.stack.rotate(dir).map(|_| ())
    }

    pub fn soft_drop(&mut self) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let now = self.now();
        match self.stack.soft_drop(now)? {
            StepOutcome::Moved => self.on_steps(1),
            StepOutcome::Locked(report) => self.on_lock(report, now),
        }
        Ok(())
    }

    pub fn hard_drop(&mut self) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let now = self.now();
        let (rows, report) = self.stack.hard_drop(now)?;
        self.on_steps(rows);
        self.on_lock(report, now);
        Ok(())
    }

    /// Passive integrity cost for downward steps
    pub(crate) fn on_steps(&mut self, steps: u32) {
        if steps == 0 || self.is_game_over() {
            return;
        }
        let cost = PASSIVE_STEP_COST * steps as f32;
        if self.integrity.damage(cost, DamageReason::PassiveDrop) {
            self.end_run("integrity depleted");
        }
    }

    /// Route a lock: row clears become score, integrity, combo and
    /// schematics in one step; an empty lock is penalized
    pub(crate) fn on_lock(&mut self, report: LockReport, now: u64) {
        if self.is_game_over() {
            return;
        }
        let k = report.cleared();
        if k == 0 {
            self.cue(AudioCue::Lock);
            self.break_combo(BreakReason::EmptyLock);
            if self.integrity.damage(EMPTY_LOCK_PENALTY, DamageReason::EmptyLock) {
                self.end_run("integrity depleted");
            }
            return;
        }

        self.run.lines_cleared += k as u32;
        self.combo.register(k as u32, ComboSource::LineClear, now);
        let base = LINE_SCORES[k.min(LINE_SCORES.len() - 1)];
        self.run.score += self.combo.award(base, true);
        self.integrity
            .restore(LINE_RESTORE_PER_ROW * k as f32, RestoreReason::LineClear);
        self.economy
            .credit(report.kind.meter(), LINE_CREDIT_PER_ROW * k as u32);

        let drafted = self.schematics.draft(report.kind, report.rotation, k);
        let label = drafted.first().map_or("", |s| s.label());
        let message = format!(
            "Cleared {} reactor line{}. Drafted {} {} schematic{}.",
            k,
            if k > 1 { "s" } else { "" },
            k,
            label,
            if k > 1 { "s" } else { "" }
        );
        self.cue(AudioCue::LineClear);
        self.note(message);
    }

    /// Bring in the next piece once the stack is idle; a blocked spawn ends
    /// the run
    pub(crate) fn spawn_if_idle(&mut self) {
        if self.is_game_over() {
            return;
        }
        let now = self.now();
        if let SpawnOutcome::Overflow(kind) = self.stack.spawn_next(now) {
            self.end_run(&format!("stack overflow spawning {}", kind.as_str()));
        }
    }

    /// Empty a full shift meter: faster gravity and a quarter turn of the
    /// flow lattice
    pub fn trigger_shift(&mut self) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let level = self.economy.level(Meter::Shift);
        if level < SHIFT_THRESHOLD {
            return Err(Rejection::ShiftNotCharged {
                level,
                required: SHIFT_THRESHOLD,
            });
        }
        self.economy.drain(Meter::Shift);
        let interval = self.stack.speed_up(SHIFT_DROP_REDUCTION_MS, MIN_DROP_MS);
        self.flow.reorient();
        self.cue(AudioCue::Shift);
        self.note("Shift actuated; the reactor realigned against the flow lattice.");
        log::info!("shift: gravity now {} ms", interval);
        Ok(())
    }

    // === Flow lattice ===

    pub fn toggle_route_mode(&mut self) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.flow.toggle_route_mode();
        Ok(())
    }

    pub fn place_or_select(&mut self, index: usize) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let now = self.now();
        match self.flow.place_or_select(&mut self.schematics, index, now)? {
            NodeAction::Placed(placement) => self.on_placement(placement),
            NodeAction::Selected(_) | NodeAction::Deselected(_) => {}
        }
        Ok(())
    }

    fn on_placement(&mut self, placement: Placement) {
        self.note(format!(
            "Locked a {} into the flow lattice.",
            placement.schematic.label()
        ));
        if placement.completes_circuit() {
            self.complete_circuit(Some(placement.schematic.kind));
        }
    }

    fn complete_circuit(&mut self, source: Option<RockKind>) {
        self.run.circuits_completed += 1;
        let infusion = Infusion::for_source(source, &mut self.rng);
        let meter = source.map_or(Meter::Earth, |k| k.meter());
        self.economy.credit(meter, CIRCUIT_CREDIT);
        self.economy.credit(Meter::Fire, CIRCUIT_FIRE_CREDIT);
        self.integrity
            .restore(CIRCUIT_RESTORE, RestoreReason::Circuit);
        self.run.score += self.combo.award(CIRCUIT_SCORE, true);
        self.cue(AudioCue::Circuit);
        self.note(format!(
            "Completed a flow circuit; a {} shard forms.",
            infusion.as_str()
        ));
        self.pending_infusions.push(infusion);
        self.apply_pending_infusions();
    }

    pub fn stabilize_route(&mut self) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let now = self.now();
        let locked = self.flow.stabilize(now)?;
        let restored = self.integrity.restore(
            STABILIZE_RESTORE_PER_NODE * locked as f32,
            RestoreReason::Stabilize,
        );
        self.cue(AudioCue::Stabilize);
        self.note(format!(
            "Stabilized {} locked nodes; integrity {:.0}.",
            locked, restored
        ));
        Ok(())
    }
}
