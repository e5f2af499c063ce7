//! Durable-write throttling.
//!
//! The projection is updated on every chunk; the store only when enough time
//! has passed or the integer percentage moved far enough.

use std::time::{Duration, Instant};

/// Decides when a progress tick should also reach the durable store.
#[derive(Debug)]
pub struct PersistThrottle {
    last_write: Instant,
    last_percent: i64,
    last_bytes: i64,
    min_interval: Duration,
    percent_step: i64,
}

impl PersistThrottle {
    /// Start a throttle at the job's initial position.
    pub fn new(min_interval: Duration, percent_step: u32, now: Instant, bytes: i64, percent: f64) -> Self {
        Self {
            last_write: now,
            last_percent: whole_percent(percent),
            last_bytes: bytes,
            min_interval,
            percent_step: i64::from(percent_step.max(1)),
        }
    }

    /// Whether a write is due at `now` for `percent`.
    pub fn should_persist(&self, now: Instant, percent: f64) -> bool {
        now.duration_since(self.last_write) >= self.min_interval
            || whole_percent(percent) >= self.last_percent + self.percent_step
    }

    /// Record a completed write.
    pub fn mark(&mut self, now: Instant, bytes: i64, percent: f64) {
        self.last_write = now;
        self.last_bytes = bytes;
        self.last_percent = whole_percent(percent);
    }

    /// Bytes and time elapsed since the last recorded write.
    pub fn since_last(&self, now: Instant, bytes: i64) -> (u64, Duration) {
        let delta = u64::try_from(bytes - self.last_bytes).unwrap_or(0);
        (delta, now.duration_since(self.last_write))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_percent(percent: f64) -> i64 {
    if percent.is_finite() { percent.floor() as i64 } else { 0 }
}
