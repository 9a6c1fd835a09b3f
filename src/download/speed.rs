//! Throughput sampling, speed smoothing and ETA estimation.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::constants::ETA_UNKNOWN;
use crate::format::format_duration;

/// Bounded FIFO of throughput samples; the reported speed is their mean.
#[derive(Debug, Clone)]
pub(crate) struct SpeedWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SpeedWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once full.
    pub(crate) fn push(&mut self, bytes_per_sec: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(bytes_per_sec);
    }

    /// Arithmetic mean of the window, 0 when empty.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Turns a stream of byte counts into smoothed speed readings on a fixed cadence.
#[derive(Debug)]
pub(crate) struct ThroughputSampler {
    interval: Duration,
    window: SpeedWindow,
    last_sample_at: Instant,
    bytes_since_sample: u64,
}

impl ThroughputSampler {
    pub(crate) fn new(interval: Duration, window_capacity: usize, started_at: Instant) -> Self {
        Self {
            interval,
            window: SpeedWindow::new(window_capacity),
            last_sample_at: started_at,
            bytes_since_sample: 0,
        }
    }

    /// Accounts `bytes` written at `now`.
    ///
    /// Returns the smoothed speed when a sample is due, `None` otherwise.
    /// A sample whose elapsed time rounds to zero does not enter the window.
    pub(crate) fn record(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        self.bytes_since_sample = self.bytes_since_sample.saturating_add(bytes);
        let elapsed = now.saturating_duration_since(self.last_sample_at);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.bytes_since_sample as f64 / secs;
            self.window.push(rate);
            self.last_sample_at = now;
            self.bytes_since_sample = 0;
        }
        Some(self.window.mean())
    }
}

/// ETA label for the remaining bytes at `speed` bytes/sec.
///
/// Both `speed` and `file_size` must be positive, otherwise `"Unknown"`.
pub(crate) fn eta_label(file_size: u64, downloaded: u64, speed: f64) -> String {
    if speed > 0.0 && speed.is_finite() && file_size > 0 {
        #[allow(clippy::cast_precision_loss)]
        let remaining = file_size.saturating_sub(downloaded) as f64;
        format_duration(remaining / speed)
    } else {
        ETA_UNKNOWN.to_string()
    }
}
