//! Piece shapes and rotation with offset kicks
//!
//! Each rock kind has four rotation states, each a fixed 4x4 occupancy mask
//! read row by row from the top. Every mask holds exactly four cells.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::kinds::RockKind;

/// 4x4 occupancy mask, `mask[y][x]`
pub type Mask = [[u8; 4]; 4];

/// Cells per piece
pub const PIECE_CELLS: usize = 4;

// Alternates between the upright L and the S
const SEDIMENTARY: [Mask; 4] = [
    [[0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [0, 0, 1, 1], [0, 1, 1, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [0, 0, 1, 1], [0, 1, 1, 0], [0, 0, 0, 0]],
];

const IGNEOUS: [Mask; 4] = [
    [[0, 0, 0, 0], [1, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const METAMORPHIC: [Mask; 4] = [
    [[0, 0, 0, 0], [0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const CRYSTAL: [Mask; 4] = [
    [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
];

/// Offsets tried in order when a rotation collides: identity, one column
/// either way, one row either way, two columns either way, then diagonals.
pub const KICKS: [IVec2; 11] = [
    IVec2::new(0, 0),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(-2, 0),
    IVec2::new(2, 0),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(1, 1),
];

/// Get the mask for a kind in a rotation state (rotation is taken mod 4)
pub fn mask(kind: RockKind, rotation: u8) -> &'static Mask {
    let r = (rotation % 4) as usize;
    match kind {
        RockKind::Sedimentary => &SEDIMENTARY[r],
        RockKind::Igneous => &IGNEOUS[r],
        RockKind::Metamorphic => &METAMORPHIC[r],
        RockKind::Crystal => &CRYSTAL[r],
    }
}

/// Occupied offsets of a mask, row-major
pub fn offsets(kind: RockKind, rotation: u8) -> [IVec2; PIECE_CELLS] {
    let mut out = [IVec2::ZERO; PIECE_CELLS];
    let mut n = 0;
    for (y, row) in mask(kind, rotation).iter().enumerate() {
        for (x, &filled) in row.iter().enumerate() {
            if filled != 0 && n < PIECE_CELLS {
                out[n] = IVec2::new(x as i32, y as i32);
                n += 1;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDir {
    Cw,
    Ccw,
}

impl RotateDir {
    pub fn apply(&self, rotation: u8) -> u8 {
        match self {
            RotateDir::Cw => (rotation + 1) % 4,
            RotateDir::Ccw => (rotation + 3) % 4,
        }
    }
}

/// A queued piece that has not spawned yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPiece {
    pub kind: RockKind,
    pub rotation: u8,
}

/// A piece on the stack: kind, rotation state and mask origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: RockKind,
    pub rotation: u8,
    pub origin: IVec2,
}

impl Piece {
    pub fn new(kind: RockKind, rotation: u8, origin: IVec2) -> Self {
        Self {
            kind,
            rotation: rotation % 4,
            origin,
        }
    }

    /// Board cells covered by this piece
    pub fn cells(&self) -> [IVec2; PIECE_CELLS] {
        offsets(self.kind, self.rotation).map(|o| self.origin + o)
    }

    pub fn shifted(&self, delta: IVec2) -> Self {
        Self {
            origin: self.origin + delta,
            ..*self
        }
    }
}

/// Rotate with kicks. Returns the rotated piece and the kick that fit, or
/// `None` if every kick collides.
pub fn try_rotate(
    piece: &Piece,
    dir: RotateDir,
    is_free: impl Fn(IVec2) -> bool,
) -> Option<(Piece, IVec2)> {
    let rotation = dir.apply(piece.rotation);
    let shape = offsets(piece.kind, rotation);

    for &kick in KICKS.iter() {
        let origin = piece.origin + kick;
        if shape.iter().all(|&o| is_free(origin + o)) {
            return Some((Piece::new(piece.kind, rotation, origin), kick));
        }
    }
    None
}
