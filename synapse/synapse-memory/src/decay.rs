//! Lazy exponential decay.
//!
//! Nothing in Synapse decays on a timer. Stored values carry the time they
//! were last updated and are decayed when read: `v(t) = v0 * exp(-rate * t)`.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Seconds elapsed between two instants, never negative
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0
    }
}

/// Decay a value by `exp(-rate * elapsed)`.
///
/// The result is clamped to `[0, value]`, so it never goes negative and
/// never grows.
pub fn decayed(value: f64, rate: f64, elapsed: Duration) -> f64 {
    decayed_secs(value, rate, elapsed.as_secs_f64())
}

pub(crate) fn decayed_secs(value: f64, rate: f64, elapsed_secs: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    let factor = (-rate.max(0.0) * elapsed_secs.max(0.0)).exp();
    (value * factor).clamp(0.0, value)
}

/// A value in `[0, 1]` that decays from the moment it was last set
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Decaying {
    pub level: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Decaying {
    pub fn new(level: f64, at: Option<DateTime<Utc>>) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            updated_at: at,
        }
    }

    /// Value at `now`. A value that was never set does not decay.
    pub fn at(&self, now: DateTime<Utc>, rate: f64) -> f64 {
        match self.updated_at {
            Some(updated_at) => decayed_secs(self.level, rate, elapsed_secs(updated_at, now)),
            None => self.level,
        }
    }

    /// Decay to `now`, add `amount`, cap at 1.0
    pub fn add(&mut self, amount: f64, now: DateTime<Utc>, rate: f64) -> f64 {
        let current = self.at(now, rate);
        self.level = (current + amount.max(0.0)).min(1.0);
        self.updated_at = Some(now);
        self.level
    }
}
