//! One transfer attempt: stream the body into a private temp file, then
//! commit it onto the destination.
//!
//! The executor never leaves a temp file behind. On success the temp file is
//! moved onto the destination; on error or cancellation it is deleted and the
//! destination is left untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, header_u64};
use super::config::EngineConfig;
use super::constants::ETA_COMPLETE;
use super::error::DownloadError;
use super::speed::{ThroughputSampler, eta_label};
use super::task::TaskReporter;

/// How an attempt ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// The destination now holds the body.
    Completed {
        /// Bytes written.
        bytes: u64,
    },
    /// Cancellation was observed mid-stream.
    Cancelled,
}

/// Streams single attempts for one engine.
#[derive(Debug, Clone)]
pub(crate) struct TransferExecutor {
    client: HttpClient,
    config: Arc<EngineConfig>,
}

impl TransferExecutor {
    pub(crate) fn new(client: HttpClient, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    /// Runs one attempt and cleans up the temp file on every non-success path.
    ///
    /// # Errors
    ///
    /// Transport, HTTP status and filesystem errors from the attempt.
    #[instrument(skip(self, reporter, temp_path), fields(task_id = %reporter.id()))]
    pub(crate) async fn execute(
        &self,
        reporter: &TaskReporter,
        url: &str,
        destination: &Path,
        temp_path: PathBuf,
    ) -> Result<AttemptOutcome, DownloadError> {
        reporter.update(|s| {
            s.reset_attempt_metrics();
            s.temp_path = Some(temp_path.clone());
        });

        let result = self.stream_and_commit(reporter, url, destination, &temp_path).await;

        if !matches!(result, Ok(AttemptOutcome::Completed { .. })) {
            remove_temp_file(&temp_path).await;
            reporter.update(|s| s.temp_path = None);
        }
        result
    }

    async fn stream_and_commit(
        &self,
        reporter: &TaskReporter,
        url: &str,
        destination: &Path,
        temp_path: &Path,
    ) -> Result<AttemptOutcome, DownloadError> {
        let response = self.client.get(url).await?;

        if reporter.current().file_size == 0
            && let Some(length) = header_u64(response.headers(), CONTENT_LENGTH)
        {
            debug!(length, "size recovered from GET response");
            reporter.update(|s| s.file_size = length);
        }
        let file_size = reporter.current().file_size;

        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let file = File::create(temp_path)
            .await
            .map_err(|e| DownloadError::io(temp_path, e))?;
        let mut writer = BufWriter::new(file);

        let chunk_size = self.config.chunk_size.max(1);
        let mut sampler = ThroughputSampler::new(
            self.config.sample_interval,
            self.config.speed_window,
            Instant::now(),
        );
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|e| DownloadError::from_reqwest(url, e))?;

            for chunk in frame.chunks(chunk_size) {
                writer
                    .write_all(chunk)
                    .await
                    .map_err(|e| DownloadError::io(temp_path, e))?;
                downloaded += chunk.len() as u64;

                // Byte count on every chunk; progress, speed and ETA on the cadence.
                let sample = sampler.record(chunk.len() as u64, Instant::now());
                reporter.update(|s| {
                    s.downloaded_bytes = downloaded;
                    if let Some(speed) = sample {
                        s.refresh_progress();
                        s.speed = speed;
                        s.eta = eta_label(file_size, downloaded, speed);
                    }
                });

                if reporter.is_cancelled() {
                    info!(downloaded, "cancellation observed mid-stream");
                    return Ok(AttemptOutcome::Cancelled);
                }
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(temp_path, e))?;
        drop(writer);

        reporter.update(|s| {
            s.downloaded_bytes = downloaded;
            s.refresh_progress();
        });

        commit_temp_file(temp_path, destination).await?;

        reporter.update(|s| {
            s.temp_path = None;
            s.progress = 1.0;
            s.speed = 0.0;
            s.eta = ETA_COMPLETE.to_string();
        });
        info!(bytes = downloaded, destination = %destination.display(), "transfer committed");
        Ok(AttemptOutcome::Completed { bytes: downloaded })
    }
}

/// Moves `temp_path` onto `destination`, replacing any existing file.
///
/// Falls back to copy-then-delete when the rename fails, e.g. when the temp
/// directory lives on another filesystem.
pub(crate) async fn commit_temp_file(
    temp_path: &Path,
    destination: &Path,
) -> Result<(), DownloadError> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    match fs::remove_file(destination).await {
        Ok(()) => debug!(destination = %destination.display(), "replaced existing file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(DownloadError::io(destination, e)),
    }

    if let Err(rename_error) = fs::rename(temp_path, destination).await {
        debug!(error = %rename_error, "rename failed, copying instead");
        fs::copy(temp_path, destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        fs::remove_file(temp_path)
            .await
            .map_err(|e| DownloadError::io(temp_path, e))?;
    }
    Ok(())
}

async fn remove_temp_file(temp_path: &Path) {
    match fs::remove_file(temp_path).await {
        Ok(()) => debug!(path = %temp_path.display(), "temp file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %temp_path.display(), error = %e, "failed to remove temp file"),
    }
}
