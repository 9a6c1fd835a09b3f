//! Constants for the download module (timeouts, chunking, sampling, backoff).

use std::time::Duration;

/// Connect timeout for transfer requests (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Per-read timeout while streaming a transfer body (30 seconds).
pub const TRANSFER_TIMEOUT_SECS: u64 = 30;

/// Total timeout for probe requests, HEAD and the ranged GET fallback (10 seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Size of the slices written to the temporary file (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Minimum wall time between two progress/speed samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Number of speed samples kept for the moving average.
pub const SPEED_WINDOW: usize = 10;

/// Backoff ceiling expressed in backoff time units.
pub const MAX_BACKOFF_UNITS: u32 = 30;

/// One backoff time unit.
pub const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Range requested by the probe fallback.
pub const PROBE_RANGE: &str = "bytes=0-1023";

/// Marker appended to the file stem of in-progress temporary files.
pub const TEMP_MARKER: &str = ".litefetch_tmp";

/// Default retry ceiling for new tasks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// ETA label when no estimate is possible.
pub const ETA_UNKNOWN: &str = "Unknown";

/// ETA label once the destination has been committed.
pub const ETA_COMPLETE: &str = "Complete";

/// Default User-Agent for all engine requests.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("litefetch/{version}")
}
