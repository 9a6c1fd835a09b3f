//! Task identity, status, requests and the snapshots published to observers.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use super::constants::{DEFAULT_MAX_RETRIES, ETA_UNKNOWN};
use super::probe::ServerCapabilities;
use crate::format::{format_bytes, format_speed};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next id from the process-wide counter.
    pub(crate) fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value. Ids built this way are not guaranteed to be registered.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a task.
///
/// `Pending → Analyzing → Downloading → {Complete | Error | Cancelled}`.
/// Cancellation can also end a task straight from `Pending` or `Analyzing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    /// Registered, worker not started yet.
    Pending,
    /// Probing the server.
    Analyzing,
    /// Transferring, including backoff waits between attempts.
    Downloading,
    /// Destination committed.
    Complete,
    /// Retries exhausted or a permanent failure.
    Error,
    /// Stopped on request; nothing was committed.
    Cancelled,
}

impl TaskStatus {
    /// `true` for `Complete`, `Error` and `Cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// `true` while a worker is still driving the task.
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Analyzing => "Analyzing",
            Self::Downloading => "Downloading",
            Self::Complete => "Complete",
            Self::Error => "Error",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A download submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// HTTP or HTTPS URL.
    pub url: String,
    /// Final path of the downloaded file.
    pub destination: PathBuf,
    /// Retry ceiling; at most `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Requested connection count. Only 1 is honoured.
    pub segments: u32,
}

impl DownloadRequest {
    /// Creates a request with default retries and a single segment.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            segments: 1,
        }
    }

    /// Sets the retry ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the requested segment count.
    #[must_use]
    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }
}

/// Immutable view of a task at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    /// Task identity.
    pub id: TaskId,
    /// Source URL.
    pub url: String,
    /// Destination path.
    pub destination: PathBuf,
    /// Effective segment count.
    pub segments: u32,
    /// Current state.
    pub status: TaskStatus,
    /// Bytes written during the current attempt.
    pub downloaded_bytes: u64,
    /// Expected size, 0 when unknown.
    pub file_size: u64,
    /// Fraction in `[0, 1]`; held at 0 while the size is unknown.
    pub progress: f64,
    /// Smoothed transfer rate in bytes/sec.
    pub speed: f64,
    /// Formatted remaining time, `"Unknown"` or `"Complete"`.
    pub eta: String,
    /// Index of the current attempt (0-based).
    pub retry_count: u32,
    /// Retry ceiling.
    pub max_retries: u32,
    /// Most recent attempt failure.
    pub last_error: Option<String>,
    /// Terminal failure message.
    pub error_message: Option<String>,
    /// Non-fatal probe failure message.
    pub probe_advisory: Option<String>,
    /// Cancellation was requested.
    pub cancel_requested: bool,
    /// Temp file of the running attempt.
    pub temp_path: Option<PathBuf>,
    /// Probe results.
    pub capabilities: ServerCapabilities,
    /// Backoff delays actually slept, in order.
    pub backoff_waits: Vec<Duration>,
}

impl TaskSnapshot {
    /// Initial `Pending` snapshot for `request`.
    #[must_use]
    pub fn new(id: TaskId, request: &DownloadRequest) -> Self {
        Self {
            id,
            url: request.url.clone(),
            destination: request.destination.clone(),
            segments: request.segments,
            status: TaskStatus::Pending,
            downloaded_bytes: 0,
            file_size: 0,
            progress: 0.0,
            speed: 0.0,
            eta: ETA_UNKNOWN.to_string(),
            retry_count: 0,
            max_retries: request.max_retries,
            last_error: None,
            error_message: None,
            probe_advisory: None,
            cancel_requested: false,
            temp_path: None,
            capabilities: ServerCapabilities::default(),
            backoff_waits: Vec::new(),
        }
    }

    /// Recomputes `progress` from `downloaded_bytes` and `file_size`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn refresh_progress(&mut self) {
        if self.file_size > 0 {
            self.progress = (self.downloaded_bytes as f64 / self.file_size as f64).min(1.0);
        }
    }

    /// Clears per-attempt metrics at the start of an attempt.
    pub(crate) fn reset_attempt_metrics(&mut self) {
        self.downloaded_bytes = 0;
        self.progress = 0.0;
        self.speed = 0.0;
        self.eta = ETA_UNKNOWN.to_string();
    }

    /// One-line human summary of the task.
    ///
    /// ```text
    /// 1.5 MB / 3.0 MB (50%) • 512.0 KB/s • ETA: 3s
    /// 1.5 MB downloaded • 512.0 KB/s
    /// Completed • 3.0 MB
    /// Error: download failed after 4 attempts: ...
    /// ```
    #[must_use]
    pub fn status_line(&self) -> String {
        match self.status {
            TaskStatus::Pending => "Waiting to start".to_string(),
            TaskStatus::Analyzing => "Analyzing server capabilities...".to_string(),
            TaskStatus::Downloading if self.file_size > 0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let percent = (self.progress * 100.0) as u32;
                format!(
                    "{} / {} ({percent}%) • {} • ETA: {}",
                    format_bytes(self.downloaded_bytes),
                    format_bytes(self.file_size),
                    format_speed(self.speed),
                    self.eta
                )
            }
            TaskStatus::Downloading => format!(
                "{} downloaded • {}",
                format_bytes(self.downloaded_bytes),
                format_speed(self.speed)
            ),
            TaskStatus::Complete if self.file_size > 0 => {
                format!("Completed • {}", format_bytes(self.file_size))
            }
            TaskStatus::Complete => "Download completed".to_string(),
            TaskStatus::Error => format!(
                "Error: {}",
                self.error_message.as_deref().unwrap_or("unknown error")
            ),
            TaskStatus::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// Cooperative cancellation flag shared by the manager and one worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The worker's write side of a task: sole owner of the snapshot sender.
#[derive(Debug)]
pub(crate) struct TaskReporter {
    id: TaskId,
    sender: watch::Sender<TaskSnapshot>,
    cancel: CancelToken,
}

impl TaskReporter {
    pub(crate) fn new(
        id: TaskId,
        sender: watch::Sender<TaskSnapshot>,
        cancel: CancelToken,
    ) -> Self {
        Self { id, sender, cancel }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Applies `f` and publishes the result as one atomic swap.
    pub(crate) fn update(&self, f: impl FnOnce(&mut TaskSnapshot)) {
        let cancel_requested = self.cancel.is_cancelled();
        self.sender.send_modify(|snapshot| {
            f(snapshot);
            snapshot.cancel_requested |= cancel_requested;
        });
    }

    /// Copy of the latest published snapshot.
    pub(crate) fn current(&self) -> TaskSnapshot {
        self.sender.borrow().clone()
    }
}
