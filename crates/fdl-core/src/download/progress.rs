//! Progress arithmetic and human-readable formatting.

use std::time::Duration;

/// Speed string shown when nothing is flowing.
pub const IDLE_SPEED: &str = "0 B/s";

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Percentage of `downloaded` over `total`.
///
/// Returns 0 when the total is unknown (`<= 0`) instead of dividing by zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_percent(downloaded: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (downloaded as f64 / total as f64) * 100.0
}

/// Throughput of `bytes` over `elapsed`; zero elapsed time yields zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes_per_second(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs
}

/// Format a throughput value, e.g. `"1.5 MB/s"`.
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return IDLE_SPEED.to_string();
    }
    if bytes_per_sec >= GIB {
        format!("{:.1} GB/s", bytes_per_sec / GIB)
    } else if bytes_per_sec >= MIB {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{bytes_per_sec:.1} B/s")
    }
}

/// Format a byte count, e.g. `"3.2 MB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: i64) -> String {
    let value = bytes.max(0) as f64;
    if value >= GIB {
        format!("{:.1} GB", value / GIB)
    } else if value >= MIB {
        format!("{:.1} MB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{} B", bytes.max(0))
    }
}
