//! Rock kinds, infusions and meters, plus the fixed mappings between them

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The four rock kinds shared by match tiles and falling pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RockKind {
    Sedimentary,
    Igneous,
    Metamorphic,
    Crystal,
}

impl RockKind {
    pub const ALL: [RockKind; 4] = [
        RockKind::Sedimentary,
        RockKind::Igneous,
        RockKind::Metamorphic,
        RockKind::Crystal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RockKind::Sedimentary => "sedimentary",
            RockKind::Igneous => "igneous",
            RockKind::Metamorphic => "metamorphic",
            RockKind::Crystal => "crystal",
        }
    }

    /// Meter credited when this kind is matched or cleared
    pub fn meter(&self) -> Meter {
        match self {
            RockKind::Sedimentary => Meter::Earth,
            RockKind::Igneous => Meter::Fire,
            RockKind::Metamorphic => Meter::Water,
            RockKind::Crystal => Meter::Shift,
        }
    }

    /// Infusion produced by a circuit built from this kind's schematic
    pub fn infusion(&self) -> Infusion {
        match self {
            RockKind::Sedimentary => Infusion::Geolocked,
            RockKind::Igneous => Infusion::Volcanic,
            RockKind::Metamorphic => Infusion::Flux,
            RockKind::Crystal => Infusion::Prismatic,
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Tile enhancement produced by completing a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Infusion {
    Volcanic,
    Geolocked,
    Flux,
    Prismatic,
}

impl Infusion {
    pub const ALL: [Infusion; 4] = [
        Infusion::Volcanic,
        Infusion::Geolocked,
        Infusion::Flux,
        Infusion::Prismatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Infusion::Volcanic => "volcanic",
            Infusion::Geolocked => "geolocked",
            Infusion::Flux => "flux",
            Infusion::Prismatic => "prismatic",
        }
    }

    /// Tile kind this infusion prefers to land on
    pub fn target_kind(&self) -> RockKind {
        match self {
            Infusion::Volcanic => RockKind::Igneous,
            Infusion::Geolocked => RockKind::Sedimentary,
            Infusion::Flux => RockKind::Metamorphic,
            Infusion::Prismatic => RockKind::Crystal,
        }
    }

    /// Mapped infusion when the source kind is known, uniform pick otherwise
    pub fn for_source<R: Rng>(source: Option<RockKind>, rng: &mut R) -> Self {
        match source {
            Some(kind) => kind.infusion(),
            None => Self::ALL[rng.random_range(0..Self::ALL.len())],
        }
    }
}

/// The four resource meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Meter {
    Earth,
    Water,
    Fire,
    Shift,
}

impl Meter {
    pub const ALL: [Meter; 4] = [Meter::Earth, Meter::Water, Meter::Fire, Meter::Shift];

    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Meter::Earth => 0,
            Meter::Water => 1,
            Meter::Fire => 2,
            Meter::Shift => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Meter::Earth => "earth",
            Meter::Water => "water",
            Meter::Fire => "fire",
            Meter::Shift => "shift",
        }
    }
}
