//! Human-facing formatting: byte sizes and relative ages.

use std::time::SystemTime;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count for display.
///
/// `None` renders as `"-"` (unknown size, e.g. a failed stat), `0` as
/// `"0 B"`. Otherwise the largest 1024-based unit where the value stays
/// below 1024 is used, with one decimal place only while the value is
/// below 10 and the unit is not bytes.
pub fn human_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return "-".to_string();
    };
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 || value >= 10.0 {
        format!("{} {}", value.round() as u64, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// Bucket thresholds in seconds, largest first.
const AGE_BUCKETS: &[(u64, &str)] = &[
    (31_536_000, "y"),
    (2_592_000, "mo"),
    (86_400, "d"),
    (3_600, "h"),
    (60, "m"),
];

/// Format how long ago `instant` was, relative to `now`.
///
/// Returns `""` for a missing instant. Future instants clamp to `0s ago`.
pub fn time_ago(instant: Option<SystemTime>, now: SystemTime) -> String {
    let Some(instant) = instant else {
        return String::new();
    };
    let seconds = now
        .duration_since(instant)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    for &(bucket, unit) in AGE_BUCKETS {
        if seconds >= bucket {
            return format!("{}{unit} ago", seconds / bucket);
        }
    }
    format!("{seconds}s ago")
}
