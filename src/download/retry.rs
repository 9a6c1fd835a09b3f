//! Retry policy with exponential backoff for failed transfer attempts.
//!
//! Each failed attempt is classified into a [`FailureType`]. The
//! [`RetryPolicy`] then decides whether another attempt is allowed and how
//! long to wait before it.
//!
//! # Backoff
//!
//! Attempts are numbered from 0. No wait precedes attempt 0; before attempt
//! `k >= 1` the controller sleeps `min(2^k, 30)` backoff units (one unit is
//! one second unless configured otherwise). The delay is exact; there is no
//! jitter.
//!
//! # Example
//!
//! ```
//! use litefetch_core::download::{classify_error, DownloadError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::with_max_retries(3);
//! let error = DownloadError::http_status("https://example.com/file.iso", 503);
//!
//! match policy.should_retry(classify_error(&error), 0) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 1);
//!         assert_eq!(delay.as_secs(), 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::{BACKOFF_UNIT, DEFAULT_MAX_RETRIES, MAX_BACKOFF_UNITS};
use super::error::DownloadError;

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeouts, connection resets, 408, 429, 5xx.
    Transient,

    /// Failure that will not succeed regardless of retries.
    ///
    /// Examples: 404, 400, invalid URL, TLS errors, local filesystem errors.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Index of the next attempt (0-based, so the first retry is 1).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry configuration for one task.
///
/// # Default Values
///
/// - `max_retries`: 3 (so at most 4 attempts)
/// - `backoff_unit`: 1 second
/// - `max_backoff_units`: 30
/// - `retry_permanent`: false
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_unit: Duration,
    max_backoff_units: u32,
    retry_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: BACKOFF_UNIT,
            max_backoff_units: MAX_BACKOFF_UNITS,
            retry_permanent: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    #[must_use]
    pub fn new(
        max_retries: u32,
        backoff_unit: Duration,
        max_backoff_units: u32,
        retry_permanent: bool,
    ) -> Self {
        Self {
            max_retries,
            backoff_unit,
            max_backoff_units: max_backoff_units.max(1),
            retry_permanent,
        }
    }

    /// Creates a policy with a custom retry ceiling, using defaults for other settings.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the retry ceiling.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the maximum number of attempts (`max_retries + 1`).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay slept before attempt `attempt` (0-based). Zero for attempt 0.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let units = 1_u32
            .checked_shl(attempt)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_units);
        self.backoff_unit.saturating_mul(units)
    }

    /// Determines whether to retry after attempt `attempt` (0-based) failed.
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent && !self.retry_permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_retries {
            debug!(attempt, max = self.max_retries, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        let next = attempt + 1;
        let delay = self.backoff_delay(next);

        debug!(
            attempt,
            next_attempt = next,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: next,
        }
    }
}

/// Terminal error message naming how many attempts were made.
#[must_use]
pub fn exhausted_message(attempts: u32, error: &DownloadError) -> String {
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    format!("download failed after {attempts} {noun}: {error}")
}

/// Classifies a download error into a failure type for retry decisions.
///
/// # HTTP Status Code Classification
///
/// | Status | Type |
/// |--------|------|
/// | 408 | Transient |
/// | 429 | Transient |
/// | other 4xx | Permanent |
/// | 5xx | Transient |
///
/// # Non-HTTP Errors
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (connect, request, body) | Transient |
/// | Network (TLS handshake, builder, redirect limit) | Permanent |
/// | IO | Permanent |
/// | InvalidUrl | Permanent |
/// | ClientBuild | Permanent |
#[instrument]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),

        DownloadError::Timeout { .. } => FailureType::Transient,

        DownloadError::Network { source, .. } => classify_transport_error(source),

        DownloadError::Io { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::ClientBuild { .. } => FailureType::Permanent,
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient, // Request Timeout
        429 => FailureType::Transient, // Too Many Requests
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Classifies a transport-level reqwest error by its kind.
///
/// Connect, request and body failures are transient, except a connect
/// failure caused by the TLS handshake. Builder and redirect-policy errors
/// cannot succeed on retry.
fn classify_transport_error(error: &reqwest::Error) -> FailureType {
    if error.is_builder() || error.is_redirect() {
        return FailureType::Permanent;
    }
    if error.is_connect() && is_tls_handshake_failure(error) {
        return FailureType::Permanent;
    }
    FailureType::Transient
}

/// TLS stacks report handshake and certificate failures as
/// `io::ErrorKind::InvalidData`; refused or reset sockets use other kinds.
fn is_tls_handshake_failure(error: &reqwest::Error) -> bool {
    let mut current = std::error::Error::source(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<std::io::Error>()
            && io_error.kind() == std::io::ErrorKind::InvalidData
        {
            return true;
        }
        current = err.source();
    }
    false
}
