//! Bounded run health; reaching zero ends the run

use serde::{Deserialize, Serialize};

use crate::consts::INTEGRITY_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageReason {
    /// Piece stepped down a row
    PassiveDrop,
    /// Piece locked without clearing a row
    EmptyLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreReason {
    LineClear,
    Circuit,
    Stabilize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrityModel {
    value: f32,
    depleted: bool,
}

impl Default for IntegrityModel {
    fn default() -> Self {
        Self {
            value: INTEGRITY_MAX,
            depleted: false,
        }
    }
}

impl IntegrityModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary (clamped) value
    pub fn with_value(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, INTEGRITY_MAX),
            depleted: value <= 0.0,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    /// Subtract, clamping at zero. Returns true on the hit that depletes it.
    pub fn damage(&mut self, amount: f32, reason: DamageReason) -> bool {
        if self.depleted {
            return false;
        }
        self.value = (self.value - amount).clamp(0.0, INTEGRITY_MAX);
        if reason != DamageReason::PassiveDrop {
            log::debug!("integrity -{:.2} ({:?}) -> {:.2}", amount, reason, self.value);
        }
        if self.value <= 0.0 {
            self.depleted = true;
            log::info!("integrity depleted by {:?}", reason);
            return true;
        }
        false
    }

    /// Add, clamping at the cap. A depleted model stays depleted.
    pub fn restore(&mut self, amount: f32, reason: RestoreReason) -> f32 {
        if !self.depleted {
            self.value = (self.value + amount).clamp(0.0, INTEGRITY_MAX);
            log::debug!("integrity +{:.2} ({:?}) -> {:.2}", amount, reason, self.value);
        }
        self.value
    }
}
