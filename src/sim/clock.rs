//! Monotonic millisecond clock and scheduled deadlines
//!
//! Every settle window, cooldown and decay timer in the simulation is a
//! [`Deadline`] keyed to the owning state's clock. Nothing here reads wall time.

use serde::{Deserialize, Serialize};

/// Simulation clock, advanced only by `tick`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    now_ms: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self { now_ms: 0 }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Advance by `dt_ms`, returning the new time
    pub fn advance(&mut self, dt_ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        self.now_ms
    }
}

/// A cancellable deferred action with an explicit ready-at timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    ready_at: Option<u64>,
}

impl Deadline {
    /// An unarmed deadline
    pub const IDLE: Deadline = Deadline { ready_at: None };

    /// Arm (or re-arm) to fire `duration_ms` after `now`
    pub fn arm(&mut self, now: u64, duration_ms: u64) {
        self.ready_at = Some(now.saturating_add(duration_ms));
    }

    pub fn cancel(&mut self) {
        self.ready_at = None;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.ready_at.is_some()
    }

    pub fn ready_at(&self) -> Option<u64> {
        self.ready_at
    }

    /// True once the deadline is armed and `now` has reached it
    #[inline]
    pub fn is_due(&self, now: u64) -> bool {
        self.ready_at.is_some_and(|at| now >= at)
    }

    /// Milliseconds left before the deadline fires (0 when unarmed or due)
    pub fn remaining(&self, now: u64) -> u64 {
        self.ready_at.map_or(0, |at| at.saturating_sub(now))
    }

    /// Fire at most once: returns true and disarms if due
    pub fn take_due(&mut self, now: u64) -> bool {
        if self.is_due(now) {
            self.ready_at = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_fires_once() {
        let mut clock = Clock::new();
        let mut deadline = Deadline::IDLE;
        assert!(!deadline.is_due(clock.now()));

        deadline.arm(clock.now(), 100);
        clock.advance(99);
        assert!(!deadline.take_due(clock.now()));
        assert_eq!(deadline.remaining(clock.now()), 1);

        clock.advance(1);
        assert!(deadline.take_due(clock.now()));
        assert!(!deadline.take_due(clock.now()));
        assert!(!deadline.is_armed());
    }

    #[test]
    fn test_deadline_cancel_and_rearm() {
        let mut deadline = Deadline::IDLE;
        deadline.arm(0, 50);
        deadline.cancel();
        assert!(!deadline.is_due(1_000));

        deadline.arm(10, 50);
        deadline.arm(40, 50);
        assert_eq!(deadline.ready_at(), Some(90));
    }
}
