//! Litefetch Core Library
//!
//! A single-file download engine: given a URL and a destination path it
//! probes the server, streams the body to a temporary file with live
//! progress, speed and ETA, retries transient failures with exponential
//! backoff, and commits the result onto the destination.
//!
//! # Architecture
//!
//! - [`download`] - probing, transfer attempts, retry control and the task registry
//! - [`format`] - human-readable byte counts, rates and durations
//!
//! Presentation layers (the bundled CLI included) only read
//! [`TaskSnapshot`] values and issue submit/cancel commands.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod format;

// Re-export commonly used types
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadError, DownloadManager, DownloadRequest, EngineConfig,
    FailureType, ManagerError, RetryDecision, RetryPolicy, ServerCapabilities, TaskId,
    TaskSnapshot, TaskStatus, classify_error,
};
pub use format::{format_bytes, format_duration, format_speed};
