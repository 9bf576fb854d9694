//! Flow lattice: schematic placement, route selection and well-to-conduit
//! reachability
//!
//! Nodes are addressed by row-major index on a `FLOW_SIZE` square. Wells and
//! conduits are fixed at construction; empty nodes become bridges when a
//! schematic is placed over them and never revert within a run.

use std::collections::{BTreeSet, VecDeque};

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::clock::Deadline;
use super::kinds::RockKind;
use super::pieces::mask;
use super::rejection::Rejection;
use crate::consts::{
    CONDUIT_NODES, FLOW_SIZE, PREVIEW_MS, STABILIZE_COOLDOWN_MS, STABILIZE_MIN_LOCKED, WELL_NODES,
};
use crate::{NEIGHBOURS_4, cell_to_index, index_to_cell};

/// Number of nodes in the lattice
pub const NODE_COUNT: usize = (FLOW_SIZE * FLOW_SIZE) as usize;

/// A normalized piece footprint harvested from a cleared stack row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schematic {
    pub id: u32,
    pub kind: RockKind,
    pub rotation: u8,
    /// Offsets shifted so the minimum x and y are both zero
    pub cells: Vec<IVec2>,
    pub width: i32,
    pub height: i32,
}

impl Schematic {
    pub fn from_piece(id: u32, kind: RockKind, rotation: u8) -> Self {
        let raw: Vec<IVec2> = mask(kind, rotation)
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, filled)| **filled != 0)
                    .map(move |(x, _)| IVec2::new(x as i32, y as i32))
            })
            .collect();
        let min = raw.iter().copied().fold(IVec2::splat(i32::MAX), IVec2::min);
        let cells: Vec<IVec2> = raw.iter().map(|&c| c - min).collect();
        let max = cells.iter().copied().fold(IVec2::ZERO, IVec2::max);
        Self {
            id,
            kind,
            rotation: rotation % 4,
            cells,
            width: max.x + 1,
            height: max.y + 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            RockKind::Sedimentary => "Stonework Bridge",
            RockKind::Igneous => "Volcanic Span",
            RockKind::Metamorphic => "Flux Channel",
            RockKind::Crystal => "Prism Arch",
        }
    }
}

/// FIFO of undeployed schematics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicQueue {
    items: VecDeque<Schematic>,
    next_id: u32,
}

impl SchematicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` copies of the footprint of `kind` at `rotation`
    pub fn draft(&mut self, kind: RockKind, rotation: u8, count: usize) -> &[Schematic] {
        let start = self.items.len();
        for _ in 0..count {
            self.next_id += 1;
            self.items
                .push_back(Schematic::from_piece(self.next_id, kind, rotation));
        }
        self.items.make_contiguous();
        let (front, _) = self.items.as_slices();
        &front[start..]
    }

    pub fn head(&self) -> Option<&Schematic> {
        self.items.front()
    }

    pub fn pop(&mut self) -> Option<Schematic> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schematic> {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Well,
    Conduit,
    Empty,
    Bridge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub kind: NodeKind,
    pub bridged: bool,
    pub locked: bool,
    pub schematic_id: Option<u32>,
    /// Well or conduit joined into a completed circuit
    pub energized: bool,
}

impl FlowNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            bridged: false,
            locked: false,
            schematic_id: None,
            energized: false,
        }
    }

    /// Wells, conduits and bridges carry flow; empty nodes do not
    #[inline]
    pub fn carries_flow(&self) -> bool {
        self.kind != NodeKind::Empty || self.bridged
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.kind == NodeKind::Empty && !self.bridged
    }
}

/// What clicking a node does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    /// Clicks anchor the head schematic
    Anchor,
    /// Clicks on flow-carrying nodes toggle route selection
    Route,
}

/// Transient placement highlight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub cells: Vec<usize>,
    pub valid: bool,
    expires: Deadline,
}

/// A committed placement and the wells it linked to a conduit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub schematic: Schematic,
    pub cells: Vec<usize>,
    pub linked_wells: Vec<usize>,
}

impl Placement {
    /// One circuit per placement, however many wells it linked
    pub fn completes_circuit(&self) -> bool {
        !self.linked_wells.is_empty()
    }
}

/// Result of clicking a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Placed(Placement),
    Selected(usize),
    Deselected(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNetwork {
    nodes: Vec<FlowNode>,
    pub mode: FlowMode,
    selection: BTreeSet<usize>,
    preview: Option<Preview>,
    stabilize_cooldown: Deadline,
    cooldown_ms: u64,
    /// Quarter turns applied by shift actuation
    pub orientation: u8,
}

impl Default for FlowNetwork {
    fn default() -> Self {
        Self::with_layout(&WELL_NODES, &CONDUIT_NODES)
    }
}

impl FlowNetwork {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            ..Self::default()
        }
    }

    /// Lattice with wells and conduits at the given indices
    pub fn with_layout(wells: &[usize], conduits: &[usize]) -> Self {
        let mut nodes = vec![FlowNode::new(NodeKind::Empty); NODE_COUNT];
        for &i in wells.iter().filter(|&&i| i < NODE_COUNT) {
            nodes[i] = FlowNode::new(NodeKind::Well);
        }
        for &i in conduits.iter().filter(|&&i| i < NODE_COUNT) {
            nodes[i] = FlowNode::new(NodeKind::Conduit);
        }
        Self {
            nodes,
            mode: FlowMode::Anchor,
            selection: BTreeSet::new(),
            preview: None,
            stabilize_cooldown: Deadline::IDLE,
            cooldown_ms: STABILIZE_COOLDOWN_MS,
            orientation: 0,
        }
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&FlowNode> {
        self.nodes.get(index)
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn cooldown_remaining(&self, now: u64) -> u64 {
        self.stabilize_cooldown.remaining(now)
    }

    fn set_preview(&mut self, cells: Vec<usize>, valid: bool, now: u64) {
        let mut expires = Deadline::IDLE;
        expires.arm(now, PREVIEW_MS);
        self.preview = Some(Preview {
            cells,
            valid,
            expires,
        });
    }

    /// Expire the preview highlight
    pub fn update(&mut self, now: u64) {
        if self
            .preview
            .as_ref()
            .is_some_and(|p| p.expires.is_due(now))
        {
            self.preview = None;
        }
    }

    /// Switch between anchoring and route selection. Leaving route mode
    /// clears the selection and any preview.
    pub fn toggle_route_mode(&mut self) -> FlowMode {
        self.mode = match self.mode {
            FlowMode::Anchor => FlowMode::Route,
            FlowMode::Route => {
                self.selection.clear();
                self.preview = None;
                FlowMode::Anchor
            }
        };
        self.mode
    }

    /// Indices a schematic would cover at `anchor`, or why it cannot go there.
    /// The index list holds only in-bounds cells.
    pub fn footprint(
        &self,
        schematic: &Schematic,
        anchor: usize,
    ) -> (Vec<usize>, Result<(), Rejection>) {
        let base = index_to_cell(anchor, FLOW_SIZE);
        let mut cells = Vec::with_capacity(schematic.cells.len());
        let mut verdict = Ok(());
        for &offset in &schematic.cells {
            match cell_to_index(base + offset, FLOW_SIZE) {
                None => verdict = Err(Rejection::PlacementOutOfBounds),
                Some(i) => {
                    if !self.nodes[i].is_open() && verdict.is_ok() {
                        verdict = Err(Rejection::PlacementOverlap);
                    }
                    cells.push(i);
                }
            }
        }
        (cells, verdict)
    }

    /// Place the head schematic anchored at `anchor`. Either every covered
    /// node becomes a locked bridge and the schematic is consumed, or nothing
    /// changes except the invalid-preview highlight.
    pub fn place(
        &mut self,
        queue: &mut SchematicQueue,
        anchor: usize,
        now: u64,
    ) -> Result<Placement, Rejection> {
        if anchor >= NODE_COUNT {
            return Err(Rejection::NoSuchNode { index: anchor });
        }
        let Some(schematic) = queue.head() else {
            self.set_preview(vec![anchor], false, now);
            return Err(Rejection::NoSchematic);
        };

        let (cells, verdict) = self.footprint(schematic, anchor);
        if let Err(reason) = verdict {
            let shown = if cells.is_empty() { vec![anchor] } else { cells };
            self.set_preview(shown, false, now);
            return Err(reason);
        }

        let Some(schematic) = queue.pop() else {
            return Err(Rejection::NoSchematic);
        };
        for &i in &cells {
            let node = &mut self.nodes[i];
            node.kind = NodeKind::Bridge;
            node.bridged = true;
            node.locked = true;
            node.schematic_id = Some(schematic.id);
        }
        self.selection.extend(cells.iter().copied());
        self.set_preview(cells.clone(), true, now);
        log::debug!(
            "placed {} #{} at node {}",
            schematic.label(),
            schematic.id,
            anchor
        );

        let linked_wells = self.evaluate_reachability();
        Ok(Placement {
            schematic,
            cells,
            linked_wells,
        })
    }

    /// Click a node: in route mode, flow-carrying nodes toggle selection and
    /// open nodes take the head schematic; in anchor mode every click places.
    pub fn place_or_select(
        &mut self,
        queue: &mut SchematicQueue,
        index: usize,
        now: u64,
    ) -> Result<NodeAction, Rejection> {
        let node = self
            .nodes
            .get(index)
            .ok_or(Rejection::NoSuchNode { index })?;
        if self.mode == FlowMode::Route && node.carries_flow() {
            if self.selection.remove(&index) {
                return Ok(NodeAction::Deselected(index));
            }
            self.selection.insert(index);
            return Ok(NodeAction::Selected(index));
        }
        self.place(queue, index, now).map(NodeAction::Placed)
    }

    /// Flood the lattice from every well over flow-carrying nodes. A well
    /// whose region holds a conduit is linked, and every well and conduit in
    /// that region is energized. Returns the wells linked for the first time.
    pub fn evaluate_reachability(&mut self) -> Vec<usize> {
        let mut visited = vec![false; NODE_COUNT];
        let mut fresh = Vec::new();

        for well in 0..NODE_COUNT {
            if self.nodes[well].kind != NodeKind::Well || visited[well] {
                continue;
            }
            let region = self.flood(well, &mut visited);
            if !region
                .iter()
                .any(|&i| self.nodes[i].kind == NodeKind::Conduit)
            {
                continue;
            }
            for i in region {
                let node = &mut self.nodes[i];
                match node.kind {
                    NodeKind::Well if !node.energized => {
                        node.energized = true;
                        fresh.push(i);
                    }
                    NodeKind::Conduit => node.energized = true,
                    _ => {}
                }
            }
        }

        fresh.sort_unstable();
        if !fresh.is_empty() {
            log::debug!("wells {:?} linked to a conduit", fresh);
        }
        fresh
    }

    /// Depth-first region of flow-carrying nodes around `start`
    fn flood(&self, start: usize, visited: &mut [bool]) -> Vec<usize> {
        let mut region = vec![start];
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(current) = stack.pop() {
            let cell = index_to_cell(current, FLOW_SIZE);
            for offset in NEIGHBOURS_4 {
                let Some(next) = cell_to_index(cell + offset, FLOW_SIZE) else {
                    continue;
                };
                if !visited[next] && self.nodes[next].carries_flow() {
                    visited[next] = true;
                    region.push(next);
                    stack.push(next);
                }
            }
        }
        region
    }

    /// Locked nodes in the current selection
    pub fn locked_selected(&self) -> usize {
        self.selection
            .iter()
            .filter(|&&i| self.nodes[i].locked)
            .count()
    }

    /// Spend the stabilizer charge. Returns the number of locked nodes
    /// selected; the caller restores integrity in proportion.
    pub fn stabilize(&mut self, now: u64) -> Result<usize, Rejection> {
        if self.mode != FlowMode::Route {
            return Err(Rejection::RouteModeInactive);
        }
        let locked = self.locked_selected();
        if locked < STABILIZE_MIN_LOCKED {
            return Err(Rejection::TooFewLockedNodes {
                locked,
                required: STABILIZE_MIN_LOCKED,
            });
        }
        let remaining_ms = self.stabilize_cooldown.remaining(now);
        if remaining_ms > 0 {
            return Err(Rejection::StabilizeCooldown { remaining_ms });
        }
        self.stabilize_cooldown.arm(now, self.cooldown_ms);
        Ok(locked)
    }

    /// Rotate the lattice a quarter turn clockwise. Node state and the route
    /// selection travel with their cells.
    pub fn reorient(&mut self) {
        let n = FLOW_SIZE;
        let source = |row: i32, col: i32| ((n - 1 - col) * n + row) as usize;
        let mut rotated = Vec::with_capacity(NODE_COUNT);
        for row in 0..n {
            for col in 0..n {
                rotated.push(self.nodes[source(row, col)]);
            }
        }
        self.nodes = rotated;
        // old (r, c) lands at (c, n - 1 - r)
        self.selection = self
            .selection
            .iter()
            .map(|&i| {
                let old = index_to_cell(i, n);
                (old.x * n + (n - 1 - old.y)) as usize
            })
            .collect();
        self.preview = None;
        self.orientation = (self.orientation + 1) % 4;
    }
}
