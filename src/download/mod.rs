//! Single-file HTTP download engine.
//!
//! A task moves through three phases:
//!
//! 1. **Probe** - HEAD (or a 1 KiB ranged GET) to learn size, range support
//!    and a server-suggested filename, without downloading the body.
//! 2. **Transfer** - stream the body into a private temp file in 8 KiB
//!    chunks, sampling speed and ETA on a fixed cadence.
//! 3. **Commit** - move the temp file onto the destination.
//!
//! Failed attempts are retried with exponential backoff. Observers read
//! [`TaskSnapshot`] values from a [`DownloadManager`] and never touch the
//! worker's state directly.
//!
//! # Example
//!
//! ```no_run
//! use litefetch_core::download::{DownloadManager, DownloadRequest, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DownloadManager::new(EngineConfig::default())?;
//! let id = manager.submit_request(
//!     DownloadRequest::new("https://example.com/ubuntu.iso", "./ubuntu.iso").with_max_retries(5),
//! )?;
//! let snapshot = manager.wait(id).await?;
//! println!("{}: {}", snapshot.id, snapshot.status_line());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
pub mod constants;
mod engine;
mod error;
mod filename;
mod manager;
mod probe;
mod retry;
mod speed;
mod task;
mod transfer;

pub use client::HttpClient;
pub use config::{ConfigError, EngineConfig};
pub use constants::DEFAULT_MAX_RETRIES;
pub use engine::DownloadEngine;
pub use error::{DownloadError, ManagerError};
pub use filename::{default_destination_name, numbered_name};
pub use manager::{DownloadManager, validate_request};
pub use probe::{ProbeReport, ServerCapabilities, parse_content_range_total, probe_capabilities};
pub use retry::{
    FailureType, RetryDecision, RetryPolicy, classify_error, exhausted_message,
};
pub use task::{CancelToken, DownloadRequest, TaskId, TaskSnapshot, TaskStatus};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
