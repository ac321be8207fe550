//! Simulation time.
//!
//! One [`SimClock`] per engine is the only source of "now". Controllers never
//! read the wall clock; they receive `now` and compute their own `dt` from
//! the last time they ran, so replaying the same tick sequence replays the
//! same motion.

use std::time::Duration;

/// Simulation clock advanced by explicit deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    elapsed: Duration,
    delta: Duration,
    tick_count: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt`. Called once per logic tick.
    pub fn advance(&mut self, dt: Duration) {
        self.delta = dt;
        self.elapsed += dt;
        self.tick_count += 1;
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.elapsed
    }

    /// Length of the last tick.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks per second implied by the last delta.
    pub fn tick_rate(&self) -> f32 {
        if self.delta.is_zero() {
            0.0
        } else {
            1.0 / self.delta.as_secs_f32()
        }
    }
}

/// Countdown measured in simulation time.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    duration: Duration,
    started: Duration,
}

impl Timer {
    /// A timer of `duration` starting at `now`.
    pub fn new(duration: Duration, now: Duration) -> Self {
        Self {
            duration,
            started: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn time_left(&self, now: Duration) -> Duration {
        self.duration
            .saturating_sub(now.saturating_sub(self.started))
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.time_left(now).is_zero()
    }

    /// Restart the countdown from `now`.
    pub fn reset(&mut self, now: Duration) {
        self.started = now;
    }
}
