//! Per-tick throughput sampling.

use std::time::Instant;

use fdl_core::download::bytes_per_second;

/// Bytes read in the current tick over wall-clock time since the previous one.
#[derive(Debug)]
pub struct SpeedMeter {
    last_tick: Instant,
}

impl SpeedMeter {
    pub const fn new(now: Instant) -> Self {
        Self { last_tick: now }
    }

    /// Take a sample; a zero-length interval yields 0 rather than a fault.
    pub fn sample(&mut self, bytes: usize, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        bytes_per_second(bytes as u64, elapsed)
    }
}
