//! Error types for the download module.
//!
//! [`DownloadError`] covers everything that can go wrong inside one transfer
//! attempt. [`ManagerError`] covers the task registry's command surface.

use std::path::PathBuf;

use thiserror::Error;

use super::config::ConfigError;
use super::task::TaskId;

/// Errors that can occur while probing or transferring a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, reset, TLS, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (temp file, destination directory, rename).
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a network or timeout error depending on the reqwest error kind.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Errors returned by [`DownloadManager`](super::DownloadManager) commands.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The submitted URL was empty.
    #[error("download URL is empty")]
    EmptyUrl,

    /// The submitted URL could not be parsed or has no host.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The submitted URL uses a scheme other than http/https.
    #[error("unsupported URL scheme '{scheme}': only http and https are supported")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// The destination path was empty.
    #[error("destination path is empty")]
    EmptyDestination,

    /// No task with this id is registered.
    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// The task has not reached a terminal state yet.
    #[error("task {0} is still active")]
    TaskStillActive(TaskId),

    /// The manager was created outside a Tokio runtime.
    #[error("download manager requires a Tokio runtime")]
    NoRuntime,

    /// The engine configuration was rejected.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    /// The engine could not be initialised.
    #[error(transparent)]
    Engine(#[from] DownloadError),
}
