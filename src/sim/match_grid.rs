//! Match board: swap, run detection, removal, gravity collapse and refill
//!
//! Coordinates are `(x, y)` with `y = 0` at the top. Cells hold `None` only
//! while a resolution is in progress; between calls every cell holds a tile.
//!
//! Resolution is single-pass: refilled cells are never re-scanned for runs.
//! Refill sampling avoids forming runs where it can, so the board a player
//! sees after a match is stable except for anchors placed by geolocked tiles.

use std::collections::BTreeMap;

use glam::IVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::clock::Deadline;
use super::kinds::{Infusion, RockKind};
use super::rejection::Rejection;
use crate::are_adjacent;
use crate::consts::{MATCH_SIZE, MAX_RESAMPLE_ATTEMPTS, MIN_RUN};

/// One rock on the match board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: RockKind,
    pub empowered: bool,
    pub infusion: Option<Infusion>,
}

impl Tile {
    pub fn new(kind: RockKind) -> Self {
        Self {
            kind,
            empowered: false,
            infusion: None,
        }
    }
}

/// Per-grid sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridPhase {
    /// Accepting swaps and empowers
    Idle,
    /// Settle window after a resolution; mutating input is rejected
    Resolving,
}

/// Matched-tile count for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTally {
    pub count: u32,
    pub empowered: u32,
}

/// Summary of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub kinds: BTreeMap<RockKind, KindTally>,
    pub infusions: BTreeMap<Infusion, u32>,
    /// Columns whose top tile was replaced by an empowered geolocked anchor
    pub anchors_reinforced: u32,
    /// Every cell that was removed, row-major order
    pub cleared: Vec<IVec2>,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }

    pub fn total_tiles(&self) -> u32 {
        self.kinds.values().map(|t| t.count).sum()
    }

    pub fn total_empowered(&self) -> u32 {
        self.kinds.values().map(|t| t.empowered).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchGrid {
    /// Row-major cells (y * MATCH_SIZE + x)
    cells: Vec<Option<Tile>>,
    pub phase: GridPhase,
    settle: Deadline,
    /// Cell picked by the first half of a swap gesture
    pub selected: Option<IVec2>,
}

impl MatchGrid {
    /// Generate a board with no pre-existing runs
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut grid = Self {
            cells: vec![None; (MATCH_SIZE * MATCH_SIZE) as usize],
            phase: GridPhase::Idle,
            settle: Deadline::IDLE,
            selected: None,
        };
        for y in 0..MATCH_SIZE {
            for x in 0..MATCH_SIZE {
                let cell = IVec2::new(x, y);
                let kind = grid.sample_stable_kind(cell, rng);
                grid.put(cell, Some(Tile::new(kind)));
            }
        }
        grid
    }

    /// Build a board from explicit kinds, rows top to bottom
    pub fn from_kinds(rows: [[RockKind; MATCH_SIZE as usize]; MATCH_SIZE as usize]) -> Self {
        let cells = rows
            .iter()
            .flat_map(|row| row.iter().map(|&k| Some(Tile::new(k))))
            .collect();
        Self {
            cells,
            phase: GridPhase::Idle,
            settle: Deadline::IDLE,
            selected: None,
        }
    }

    #[inline]
    fn index(cell: IVec2) -> Option<usize> {
        crate::cell_to_index(cell, MATCH_SIZE)
    }

    #[inline]
    pub fn in_bounds(cell: IVec2) -> bool {
        Self::index(cell).is_some()
    }

    pub fn tile(&self, cell: IVec2) -> Option<&Tile> {
        Self::index(cell).and_then(|i| self.cells[i].as_ref())
    }

    pub fn tile_mut(&mut self, cell: IVec2) -> Option<&mut Tile> {
        Self::index(cell).and_then(|i| self.cells[i].as_mut())
    }

    #[inline]
    fn kind_at(&self, cell: IVec2) -> Option<RockKind> {
        self.tile(cell).map(|t| t.kind)
    }

    fn put(&mut self, cell: IVec2, tile: Option<Tile>) {
        if let Some(i) = Self::index(cell) {
            self.cells[i] = tile;
        }
    }

    /// Rows top to bottom, for snapshots
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Tile>]> {
        self.cells.chunks(MATCH_SIZE as usize)
    }

    pub fn is_resolving(&self) -> bool {
        self.phase == GridPhase::Resolving
    }

    pub fn settle_remaining(&self, now: u64) -> u64 {
        self.settle.remaining(now)
    }

    /// Open the settle window
    pub fn begin_settle(&mut self, now: u64, settle_ms: u64) {
        self.phase = GridPhase::Resolving;
        self.settle.arm(now, settle_ms);
    }

    /// Close the settle window once due. Returns true on the closing tick.
    pub fn update(&mut self, now: u64) -> bool {
        if self.phase == GridPhase::Resolving && self.settle.take_due(now) {
            self.phase = GridPhase::Idle;
            return true;
        }
        false
    }

    /// Length of the same-kind line through `cell` along `axis` if it held `kind`
    fn line_length(&self, cell: IVec2, kind: RockKind, axis: IVec2) -> usize {
        let mut len = 1;
        for dir in [axis, -axis] {
            let mut probe = cell + dir;
            while self.kind_at(probe) == Some(kind) {
                len += 1;
                probe += dir;
            }
        }
        len
    }

    /// Would `kind` at `cell` complete a run with its current neighbours?
    pub fn creates_run_at(&self, cell: IVec2, kind: RockKind) -> bool {
        self.line_length(cell, kind, IVec2::X) >= MIN_RUN
            || self.line_length(cell, kind, IVec2::Y) >= MIN_RUN
    }

    /// Random kind that forms no run at `cell`. Attempts are capped; after that
    /// the first non-matching kind is used, and if every kind matches the last
    /// sample is kept so the call always terminates.
    fn sample_stable_kind<R: Rng>(&self, cell: IVec2, rng: &mut R) -> RockKind {
        let mut kind = RockKind::random(rng);
        for _ in 0..MAX_RESAMPLE_ATTEMPTS {
            if !self.creates_run_at(cell, kind) {
                return kind;
            }
            kind = RockKind::random(rng);
        }
        RockKind::ALL
            .into_iter()
            .find(|&k| !self.creates_run_at(cell, k))
            .unwrap_or(kind)
    }

    /// True when the tile at `cell` is part of a row or column run
    pub fn has_run_through(&self, cell: IVec2) -> bool {
        match self.kind_at(cell) {
            Some(kind) => self.creates_run_at(cell, kind),
            None => false,
        }
    }

    /// Union of every maximal row and column run, row-major order
    pub fn find_runs(&self) -> Vec<IVec2> {
        let size = MATCH_SIZE as usize;
        let mut marked = vec![false; size * size];

        let mut scan = |cells: &mut dyn Iterator<Item = IVec2>| {
            let line: Vec<IVec2> = cells.collect();
            let mut start = 0;
            while start < line.len() {
                let kind = self.kind_at(line[start]);
                let mut end = start + 1;
                while end < line.len() && kind.is_some() && self.kind_at(line[end]) == kind {
                    end += 1;
                }
                if kind.is_some() && end - start >= MIN_RUN {
                    for &c in &line[start..end] {
                        if let Some(i) = Self::index(c) {
                            marked[i] = true;
                        }
                    }
                }
                start = end;
            }
        };

        for y in 0..MATCH_SIZE {
            scan(&mut (0..MATCH_SIZE).map(|x| IVec2::new(x, y)));
        }
        for x in 0..MATCH_SIZE {
            scan(&mut (0..MATCH_SIZE).map(|y| IVec2::new(x, y)));
        }

        marked
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m)
            .map(|(i, _)| crate::index_to_cell(i, MATCH_SIZE))
            .collect()
    }

    fn swap(&mut self, a: IVec2, b: IVec2) {
        if let (Some(ia), Some(ib)) = (Self::index(a), Self::index(b)) {
            self.cells.swap(ia, ib);
        }
    }

    /// Swap two neighbouring tiles if that forms a run through either of them,
    /// then resolve. A swap that forms nothing is undone and reported as
    /// [`Rejection::NoRun`].
    pub fn try_swap<R: Rng>(
        &mut self,
        a: IVec2,
        b: IVec2,
        rng: &mut R,
    ) -> Result<MatchReport, Rejection> {
        if self.is_resolving() {
            return Err(Rejection::MatchResolving);
        }
        for cell in [a, b] {
            if !Self::in_bounds(cell) {
                return Err(Rejection::OutOfBounds {
                    x: cell.x,
                    y: cell.y,
                });
            }
        }
        if !are_adjacent(a, b) {
            return Err(Rejection::NotAdjacent);
        }

        self.swap(a, b);
        if !self.has_run_through(a) && !self.has_run_through(b) {
            self.swap(a, b);
            return Err(Rejection::NoRun);
        }
        Ok(self.resolve_runs(rng))
    }

    /// Remove every run, collapse columns, refill, and reinforce geolocked anchors
    pub fn resolve_runs<R: Rng>(&mut self, rng: &mut R) -> MatchReport {
        let cleared = self.find_runs();
        let mut report = MatchReport::default();
        if cleared.is_empty() {
            return report;
        }

        // First geolocked kind seen per column
        let mut anchors: BTreeMap<i32, RockKind> = BTreeMap::new();
        for &cell in &cleared {
            let Some(tile) = Self::index(cell).and_then(|i| self.cells[i].take()) else {
                continue;
            };
            let tally = report.kinds.entry(tile.kind).or_default();
            tally.count += 1;
            if tile.empowered {
                tally.empowered += 1;
            }
            if let Some(infusion) = tile.infusion {
                *report.infusions.entry(infusion).or_default() += 1;
                if infusion == Infusion::Geolocked {
                    anchors.entry(cell.x).or_insert(tile.kind);
                }
            }
        }
        report.cleared = cleared;

        self.collapse();
        self.refill(rng);

        for (&x, &kind) in &anchors {
            let mut anchor = Tile::new(kind);
            anchor.empowered = true;
            self.put(IVec2::new(x, 0), Some(anchor));
        }
        report.anchors_reinforced = anchors.len() as u32;

        log::debug!(
            "resolved {} tiles across {} kinds",
            report.cleared.len(),
            report.kinds.len()
        );
        report
    }

    /// Let tiles fall to fill holes, column by column
    fn collapse(&mut self) {
        for x in 0..MATCH_SIZE {
            let column: Vec<Tile> = (0..MATCH_SIZE)
                .filter_map(|y| self.tile(IVec2::new(x, y)).copied())
                .collect();
            let holes = MATCH_SIZE - column.len() as i32;
            for y in 0..MATCH_SIZE {
                let tile = if y < holes {
                    None
                } else {
                    Some(column[(y - holes) as usize])
                };
                self.put(IVec2::new(x, y), tile);
            }
        }
    }

    fn refill<R: Rng>(&mut self, rng: &mut R) {
        for y in 0..MATCH_SIZE {
            for x in 0..MATCH_SIZE {
                let cell = IVec2::new(x, y);
                if self.tile(cell).is_none() {
                    let kind = self.sample_stable_kind(cell, rng);
                    self.put(cell, Some(Tile::new(kind)));
                }
            }
        }
    }

    /// Check a tile can be empowered without touching it
    pub fn check_empower(&self, cell: IVec2) -> Result<(), Rejection> {
        if self.is_resolving() {
            return Err(Rejection::MatchResolving);
        }
        match self.tile(cell) {
            None => Err(Rejection::OutOfBounds {
                x: cell.x,
                y: cell.y,
            }),
            Some(tile) if tile.empowered => Err(Rejection::AlreadyEmpowered),
            Some(_) => Ok(()),
        }
    }

    /// Flag a tile as empowered. Funds are checked and spent by the caller.
    pub fn empower(&mut self, cell: IVec2) -> Result<RockKind, Rejection> {
        self.check_empower(cell)?;
        let tile = self.tile_mut(cell).ok_or(Rejection::OutOfBounds {
            x: cell.x,
            y: cell.y,
        })?;
        tile.empowered = true;
        Ok(tile.kind)
    }

    /// Stamp an infusion on the best-fit tile: an un-infused tile of the
    /// infusion's target kind if any, else any un-infused tile. Returns the
    /// stamped cell, or `None` when no tile is eligible.
    pub fn apply_infusion<R: Rng>(&mut self, infusion: Infusion, rng: &mut R) -> Option<IVec2> {
        let target = infusion.target_kind();
        let mut preferred = Vec::new();
        let mut fallback = Vec::new();
        for (i, slot) in self.cells.iter().enumerate() {
            if let Some(tile) = slot {
                if tile.infusion.is_some() {
                    continue;
                }
                let cell = crate::index_to_cell(i, MATCH_SIZE);
                if tile.kind == target {
                    preferred.push(cell);
                } else {
                    fallback.push(cell);
                }
            }
        }
        let pool = if preferred.is_empty() {
            fallback
        } else {
            preferred
        };
        if pool.is_empty() {
            return None;
        }
        let cell = pool[rng.random_range(0..pool.len())];
        if let Some(tile) = self.tile_mut(cell) {
            tile.infusion = Some(infusion);
        }
        Some(cell)
    }
}
