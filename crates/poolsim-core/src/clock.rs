//! Cycle clock for the simulation.
//!
//! The [`CycleClock`] counts whole simulation cycles. It only moves forward,
//! one tick per cycle, and is independent of wall-clock time so runs are
//! repeatable regardless of host speed.

use serde::{Deserialize, Serialize};

/// Monotonic cycle counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClock {
    current: u64,
}

impl CycleClock {
    /// Create a new clock at cycle zero (no cycle run yet).
    pub fn new() -> Self {
        Self { current: 0 }
    }

    /// Number of the current (or last completed) cycle.
    pub fn now(&self) -> u64 {
        self.current
    }

    /// Start the next cycle and return its number. The first tick returns 1.
    pub fn tick(&mut self) -> u64 {
        self.current += 1;
        self.current
    }
}
