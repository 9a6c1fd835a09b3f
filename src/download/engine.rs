//! Per-task pipeline: probe the server, then run transfer attempts under the
//! retry policy.
//!
//! # Overview
//!
//! [`DownloadEngine`] is cheap to clone and shared by every worker a
//! [`DownloadManager`](super::DownloadManager) spawns. Each worker calls
//! `run_task` once; the engine publishes every state change through the
//! task's reporter and always leaves the task in a terminal status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::config::EngineConfig;
use super::error::DownloadError;
use super::filename::{resolve_filename, temp_file_name};
use super::probe::probe_capabilities;
use super::retry::{RetryDecision, RetryPolicy, classify_error, exhausted_message};
use super::task::{DownloadRequest, TaskReporter, TaskStatus};
use super::transfer::{AttemptOutcome, TransferExecutor};

/// Shared engine state: one HTTP client and one configuration.
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: HttpClient,
    config: Arc<EngineConfig>,
    executor: TransferExecutor,
}

impl DownloadEngine {
    /// Builds an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the HTTP client cannot be created.
    pub fn new(config: EngineConfig) -> Result<Self, DownloadError> {
        let client = HttpClient::from_config(&config)?;
        let config = Arc::new(config);
        let executor = TransferExecutor::new(client.clone(), Arc::clone(&config));
        Ok(Self {
            client,
            config,
            executor,
        })
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drives one task from `Pending` to a terminal status.
    #[instrument(skip(self, reporter, request), fields(task_id = %reporter.id(), url = %request.url))]
    pub(crate) async fn run_task(
        &self,
        reporter: &TaskReporter,
        request: &DownloadRequest,
    ) -> TaskStatus {
        if reporter.is_cancelled() {
            return finish_cancelled(reporter);
        }

        reporter.update(|s| s.status = TaskStatus::Analyzing);
        let report = probe_capabilities(&self.client, &request.url, self.config.probe_timeout).await;
        let server_filename = report.capabilities.filename.clone();
        reporter.update(|s| {
            s.file_size = report.file_size;
            s.capabilities = report.capabilities;
            s.probe_advisory = report.advisory;
        });

        if reporter.is_cancelled() {
            return finish_cancelled(reporter);
        }

        reporter.update(|s| s.status = TaskStatus::Downloading);
        let filename = resolve_filename(
            server_filename.as_deref(),
            &request.destination,
            &request.url,
        );
        let temp_path = self
            .config
            .temp_dir
            .join(temp_file_name(&filename, reporter.id()));
        debug!(temp_path = %temp_path.display(), "resolved temp path");

        let policy = self.config.retry_policy(request.max_retries);
        self.download_with_retry(reporter, &request.url, &request.destination, &temp_path, &policy)
            .await
    }

    /// Runs attempts `0..=max_retries` until one succeeds, the task is
    /// cancelled, or the policy gives up.
    async fn download_with_retry(
        &self,
        reporter: &TaskReporter,
        url: &str,
        destination: &Path,
        temp_path: &Path,
        policy: &RetryPolicy,
    ) -> TaskStatus {
        let mut attempt = 0u32;

        loop {
            if reporter.is_cancelled() {
                return finish_cancelled(reporter);
            }
            reporter.update(|s| s.retry_count = attempt);
            debug!(attempt, "starting transfer attempt");

            let error = match self
                .executor
                .execute(reporter, url, destination, PathBuf::from(temp_path))
                .await
            {
                Ok(AttemptOutcome::Completed { bytes }) => {
                    reporter.update(|s| s.status = TaskStatus::Complete);
                    info!(bytes, attempts = attempt + 1, "download complete");
                    return TaskStatus::Complete;
                }
                Ok(AttemptOutcome::Cancelled) => return finish_cancelled(reporter),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            reporter.update(|s| s.last_error = Some(error.to_string()));

            match policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    if reporter.is_cancelled() {
                        return finish_cancelled(reporter);
                    }
                    info!(
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying download"
                    );
                    tokio::time::sleep(delay).await;
                    reporter.update(|s| s.backoff_waits.push(delay));
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    let message = exhausted_message(attempt + 1, &error);
                    warn!(%reason, error = %error, "download failed");
                    reporter.update(|s| {
                        s.status = TaskStatus::Error;
                        s.error_message = Some(message);
                        s.speed = 0.0;
                    });
                    return TaskStatus::Error;
                }
            }
        }
    }
}

fn finish_cancelled(reporter: &TaskReporter) -> TaskStatus {
    info!("download cancelled");
    reporter.update(|s| {
        s.status = TaskStatus::Cancelled;
        s.speed = 0.0;
        s.temp_path = None;
    });
    TaskStatus::Cancelled
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::sync::watch;

    use super::*;
    use crate::download::task::{CancelToken, TaskId, TaskSnapshot};

    #[test]
    fn test_engine_new_with_default_config() {
        let engine = DownloadEngine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.config().chunk_size, 8192);
    }

    #[tokio::test]
    async fn test_run_task_cancelled_before_start_never_probes() {
        let engine = DownloadEngine::new(EngineConfig::default()).unwrap();
        // Unroutable URL: any network call would fail or hang, not cancel.
        let request = DownloadRequest::new("http://192.0.2.1/file.bin", "/tmp/never.bin");
        let id = TaskId::from_raw(9000);
        let (tx, rx) = watch::channel(TaskSnapshot::new(id, &request));
        let token = CancelToken::new();
        token.cancel();
        let reporter = TaskReporter::new(id, tx, token);

        let status = engine.run_task(&reporter, &request).await;

        assert_eq!(status, TaskStatus::Cancelled);
        let snap = rx.borrow().clone();
        assert_eq!(snap.status, TaskStatus::Cancelled);
        assert!(snap.cancel_requested);
        assert!(!snap.capabilities.supports_head_requests);
    }
}
