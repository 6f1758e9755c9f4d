use bevy::prelude::*;
use std::time::Instant;

/// Millisecond clock that never runs backwards.
///
/// Snapshot timestamps and the receiver-side `time_delta` are both taken from
/// this clock, so hosts can substitute their own session clock.
pub trait MonotonicClock {
    fn now_ms(&self) -> i32;
}

/// Session clock advanced once per fixed tick.
///
/// Stepping the clock from the configured timestep instead of wall time keeps
/// headless and test runs deterministic.
#[derive(Resource, Debug, Clone, Default)]
pub struct SessionClock {
    elapsed_ms: f64,
    tick: u64,
}

impl SessionClock {
    /// Create a clock starting at `start_ms`.
    pub fn starting_at(start_ms: i32) -> Self {
        Self {
            elapsed_ms: start_ms as f64,
            tick: 0,
        }
    }

    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed_ms += dt.max(0.0) * 1000.0;
        self.tick += 1;
    }

    /// Number of ticks advanced so far
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl MonotonicClock for SessionClock {
    fn now_ms(&self) -> i32 {
        self.elapsed_ms.round() as i32
    }
}

/// Wall-clock backed implementation for hosts without a session clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> i32 {
        let elapsed = self.start.elapsed().as_millis();
        elapsed.min(i32::MAX as u128) as i32
    }
}
