//! Decaying streak counter that scales score awards

use serde::{Deserialize, Serialize};

use super::clock::Deadline;
use crate::consts::{COMBO_DECAY_MS, COMBO_MAX_MULTIPLIER, COMBO_STEP};

/// What fed the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboSource {
    Match,
    LineClear,
}

/// Why the streak ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakReason {
    /// Swap that formed no run
    Dud,
    /// Piece locked without clearing a row
    EmptyLock,
    /// Decay window ran out
    Decay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboEngine {
    pub streak: u32,
    pub multiplier: f32,
    pub max_streak: u32,
    decay: Deadline,
    decay_ms: u64,
}

impl Default for ComboEngine {
    fn default() -> Self {
        Self::new(COMBO_DECAY_MS)
    }
}

impl ComboEngine {
    pub fn new(decay_ms: u64) -> Self {
        Self {
            streak: 0,
            multiplier: 1.0,
            max_streak: 0,
            decay: Deadline::IDLE,
            decay_ms,
        }
    }

    /// Multiplier for a given streak length
    pub fn multiplier_for(streak: u32) -> f32 {
        (1.0 + COMBO_STEP * streak.saturating_sub(1) as f32).min(COMBO_MAX_MULTIPLIER)
    }

    /// Extend the streak and restart the decay window
    pub fn register(&mut self, amount: u32, source: ComboSource, now: u64) -> f32 {
        self.streak = self.streak.saturating_add(amount);
        self.max_streak = self.max_streak.max(self.streak);
        self.multiplier = Self::multiplier_for(self.streak);
        self.decay.arm(now, self.decay_ms);
        log::debug!(
            "combo +{} from {:?}: streak {} (x{:.2})",
            amount,
            source,
            self.streak,
            self.multiplier
        );
        self.multiplier
    }

    /// Reset immediately. Returns the streak that was lost, if there was one.
    pub fn break_streak(&mut self, reason: BreakReason) -> Option<u32> {
        self.decay.cancel();
        let lost = std::mem::take(&mut self.streak);
        self.multiplier = 1.0;
        if lost > 0 {
            log::debug!("combo of {} broken: {:?}", lost, reason);
            Some(lost)
        } else {
            None
        }
    }

    /// Let the decay timer run; returns the lost streak when it expires
    pub fn update(&mut self, now: u64) -> Option<u32> {
        if self.decay.take_due(now) {
            self.break_streak(BreakReason::Decay)
        } else {
            None
        }
    }

    /// Scale a base award by the multiplier when eligible
    pub fn award(&self, base: u64, combo_eligible: bool) -> u64 {
        if combo_eligible {
            (base as f64 * self.multiplier as f64).round() as u64
        } else {
            base
        }
    }

    pub fn decay_remaining(&self, now: u64) -> u64 {
        self.decay.remaining(now)
    }
}
