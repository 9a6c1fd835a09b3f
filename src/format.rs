//! Human-readable formatting for byte counts, transfer rates and durations.
//!
//! These are pure functions shared by every status-reporting path: task
//! snapshots, the CLI progress bars and log lines.

/// Units used by [`format_bytes`], smallest first.
const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Formats a byte count, e.g. `0 B`, `512 B`, `1.5 KB`, `3.2 GB`.
///
/// The value is divided by 1024 until it drops below 1024 or the largest
/// unit (TB) is reached. Plain bytes are printed as an integer, every other
/// unit with one decimal place.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    format_scaled(bytes as f64)
}

/// Formats a transfer rate in bytes per second, e.g. `1.2 MB/s`.
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_scaled(bytes_per_sec))
}

/// Formats a duration given in seconds.
///
/// - under a minute: `42s`
/// - under an hour: `3m 7s`
/// - otherwise: `2h 15m`
///
/// Negative and non-finite inputs are treated as zero.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = seconds as u64;
        whole
    } else {
        0
    };

    if total < SECONDS_PER_MINUTE {
        format!("{total}s")
    } else if total < SECONDS_PER_HOUR {
        let minutes = total / SECONDS_PER_MINUTE;
        let secs = total % SECONDS_PER_MINUTE;
        format!("{minutes}m {secs}s")
    } else {
        let hours = total / SECONDS_PER_HOUR;
        let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        format!("{hours}h {minutes}m")
    }
}

fn format_scaled(value: f64) -> String {
    let mut size = if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    };
    if size == 0.0 {
        return "0 B".to_string();
    }

    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < BYTE_UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = size as u64;
        format!("{whole} {}", BYTE_UNITS[unit_index])
    } else {
        format!("{size:.1} {}", BYTE_UNITS[unit_index])
    }
}
