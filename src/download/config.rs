//! Engine-wide configuration shared by every task a manager runs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::constants::{
    BACKOFF_UNIT, CHUNK_SIZE, CONNECT_TIMEOUT_SECS, MAX_BACKOFF_UNITS, PROBE_TIMEOUT_SECS,
    SAMPLE_INTERVAL, SPEED_WINDOW, TRANSFER_TIMEOUT_SECS, default_user_agent,
};
use super::retry::RetryPolicy;

/// Rejected [`EngineConfig`] value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A size or timeout that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The User-Agent string was empty.
    #[error("user agent must not be empty")]
    EmptyUserAgent,
}

/// Tunables for probing, streaming, sampling and backoff.
///
/// Defaults: 30 s connect and per-read timeouts, 10 s probe timeout, 8 KiB
/// chunks, 500 ms samples averaged over 10 entries, backoff unit of 1 s
/// capped at 30 units, temp files in the system temp directory.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Connect timeout for transfer requests.
    pub connect_timeout: Duration,
    /// Per-read timeout while streaming a body.
    pub transfer_timeout: Duration,
    /// Total timeout for each probe request.
    pub probe_timeout: Duration,
    /// Size of each slice written to the temp file.
    pub chunk_size: usize,
    /// Minimum wall time between two throughput samples. Zero samples every chunk.
    pub sample_interval: Duration,
    /// Number of samples in the speed moving average.
    pub speed_window: usize,
    /// One backoff time unit.
    pub backoff_unit: Duration,
    /// Backoff ceiling in units.
    pub max_backoff_units: u32,
    /// Directory receiving in-progress temp files.
    pub temp_dir: PathBuf,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Keep retrying errors classified as permanent.
    pub retry_permanent_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            transfer_timeout: Duration::from_secs(TRANSFER_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            chunk_size: CHUNK_SIZE,
            sample_interval: SAMPLE_INTERVAL,
            speed_window: SPEED_WINDOW,
            backoff_unit: BACKOFF_UNIT,
            max_backoff_units: MAX_BACKOFF_UNITS,
            temp_dir: std::env::temp_dir(),
            user_agent: default_user_agent(),
            retry_permanent_failures: false,
        }
    }
}

impl EngineConfig {
    /// Sets the temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Sets the backoff time unit.
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Sets the sampling cadence.
    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Sets the probe timeout.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets both connect and per-read transfer timeouts.
    #[must_use]
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.transfer_timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enables or disables retrying permanent failures.
    #[must_use]
    pub fn with_retry_permanent_failures(mut self, enabled: bool) -> Self {
        self.retry_permanent_failures = enabled;
        self
    }

    /// Checks that every size and timeout is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_checks = [
            ("connect_timeout", self.connect_timeout.is_zero()),
            ("transfer_timeout", self.transfer_timeout.is_zero()),
            ("probe_timeout", self.probe_timeout.is_zero()),
            ("chunk_size", self.chunk_size == 0),
            ("speed_window", self.speed_window == 0),
            ("max_backoff_units", self.max_backoff_units == 0),
        ];
        if let Some((field, _)) = zero_checks.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Zero { field });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        Ok(())
    }

    /// Builds the retry policy for a task with the given retry ceiling.
    #[must_use]
    pub fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            self.backoff_unit,
            self.max_backoff_units,
            self.retry_permanent_failures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.chunk_size, 8192);
        assert_eq!(config.speed_window, 10);
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("litefetch/"));
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "chunk_size"
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = EngineConfig::default().with_probe_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_user_agent() {
        let config = EngineConfig::default().with_user_agent("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyUserAgent));
    }

    #[test]
    fn test_zero_sample_interval_and_backoff_are_allowed() {
        let config = EngineConfig::default()
            .with_sample_interval(Duration::ZERO)
            .with_backoff_unit(Duration::ZERO);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_retry_policy_uses_backoff_settings() {
        let config = EngineConfig::default().with_backoff_unit(Duration::from_millis(5));
        let policy = config.retry_policy(4);
        assert_eq!(policy.max_retries(), 4);
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(20));
    }
}
