//! Task registry: accepts submissions, runs one Tokio task per download and
//! serves snapshots to any number of observers.
//!
//! # Example
//!
//! ```no_run
//! use litefetch_core::download::{DownloadManager, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DownloadManager::new(EngineConfig::default())?;
//! let id = manager.submit("https://example.com/file.iso", "./file.iso", 3)?;
//! let done = manager.wait(id).await?;
//! println!("{}", done.status_line());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use super::config::EngineConfig;
use super::engine::DownloadEngine;
use super::error::ManagerError;
use super::task::{
    CancelToken, DownloadRequest, TaskId, TaskReporter, TaskSnapshot, TaskStatus,
};

#[derive(Debug)]
struct TaskEntry {
    receiver: watch::Receiver<TaskSnapshot>,
    cancel: CancelToken,
}

impl TaskEntry {
    fn snapshot(&self) -> TaskSnapshot {
        let mut snapshot = self.receiver.borrow().clone();
        snapshot.cancel_requested |= self.cancel.is_cancelled();
        snapshot
    }

    fn status(&self) -> TaskStatus {
        self.receiver.borrow().status
    }
}

/// Registry of download tasks.
///
/// Clones share the same registry and engine.
#[derive(Debug, Clone)]
pub struct DownloadManager {
    engine: DownloadEngine,
    tasks: Arc<DashMap<TaskId, TaskEntry>>,
    runtime: Handle,
}

impl DownloadManager {
    /// Creates a manager bound to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::Config`] if the configuration is invalid
    /// - [`ManagerError::NoRuntime`] when called outside a Tokio runtime
    /// - [`ManagerError::Engine`] if the HTTP client cannot be built
    pub fn new(config: EngineConfig) -> Result<Self, ManagerError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ManagerError::NoRuntime)?;
        let engine = DownloadEngine::new(config)?;
        Ok(Self {
            engine,
            tasks: Arc::new(DashMap::new()),
            runtime,
        })
    }

    /// Submits a download with a single segment.
    ///
    /// # Errors
    ///
    /// Validation errors; see [`validate_request`].
    pub fn submit(
        &self,
        url: &str,
        destination: impl Into<PathBuf>,
        max_retries: u32,
    ) -> Result<TaskId, ManagerError> {
        self.submit_request(DownloadRequest::new(url, destination).with_max_retries(max_retries))
    }

    /// Validates `request`, registers it and spawns its worker.
    ///
    /// # Errors
    ///
    /// Validation errors; see [`validate_request`].
    pub fn submit_request(&self, mut request: DownloadRequest) -> Result<TaskId, ManagerError> {
        validate_request(&request)?;
        request.url = request.url.trim().to_string();
        if request.segments != 1 {
            if request.segments > 1 {
                warn!(
                    requested = request.segments,
                    "segmented downloads are not supported, using 1 connection"
                );
            }
            request.segments = 1;
        }

        let id = TaskId::next();
        let (sender, receiver) = watch::channel(TaskSnapshot::new(id, &request));
        let cancel = CancelToken::new();
        self.tasks.insert(
            id,
            TaskEntry {
                receiver,
                cancel: cancel.clone(),
            },
        );

        info!(task_id = %id, url = %request.url, destination = %request.destination.display(), "download submitted");

        let engine = self.engine.clone();
        let reporter = TaskReporter::new(id, sender, cancel);
        self.runtime.spawn(async move {
            let status = engine.run_task(&reporter, &request).await;
            debug!(task_id = %id, %status, "worker finished");
        });

        Ok(id)
    }

    /// Requests cooperative cancellation. A no-op for terminal tasks.
    ///
    /// # Errors
    ///
    /// [`ManagerError::UnknownTask`] if `id` is not registered.
    pub fn request_cancel(&self, id: TaskId) -> Result<(), ManagerError> {
        let entry = self.tasks.get(&id).ok_or(ManagerError::UnknownTask(id))?;
        if entry.status().is_active() {
            info!(task_id = %id, "cancellation requested");
            entry.cancel.cancel();
        }
        Ok(())
    }

    /// Requests cancellation of every active task; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut signalled = 0;
        for entry in self.tasks.iter() {
            if entry.status().is_active() {
                entry.cancel.cancel();
                signalled += 1;
            }
        }
        if signalled > 0 {
            info!(count = signalled, "cancellation requested for all active tasks");
        }
        signalled
    }

    /// Latest snapshot of one task.
    #[must_use]
    pub fn snapshot(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(&id).map(|entry| entry.snapshot())
    }

    /// Latest snapshots of every registered task, ordered by id.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        let mut all: Vec<TaskSnapshot> = self.tasks.iter().map(|entry| entry.snapshot()).collect();
        all.sort_by_key(|snapshot| snapshot.id);
        all
    }

    /// A receiver that observes every snapshot the worker publishes.
    #[must_use]
    pub fn subscribe(&self, id: TaskId) -> Option<watch::Receiver<TaskSnapshot>> {
        self.tasks.get(&id).map(|entry| entry.receiver.clone())
    }

    /// Resolves once the task reaches a terminal status.
    ///
    /// If the worker stops publishing without finishing, the last published
    /// snapshot is returned.
    ///
    /// # Errors
    ///
    /// [`ManagerError::UnknownTask`] if `id` is not registered.
    pub async fn wait(&self, id: TaskId) -> Result<TaskSnapshot, ManagerError> {
        let (mut receiver, cancel) = {
            let entry = self.tasks.get(&id).ok_or(ManagerError::UnknownTask(id))?;
            (entry.receiver.clone(), entry.cancel.clone())
        };

        let terminal = receiver
            .wait_for(|s| s.status.is_terminal())
            .await
            .map(|terminal| TaskSnapshot::clone(&terminal));
        let mut snapshot = match terminal {
            Ok(snapshot) => snapshot,
            Err(_) => receiver.borrow().clone(),
        };
        snapshot.cancel_requested |= cancel.is_cancelled();
        Ok(snapshot)
    }

    /// Number of tasks not yet in a terminal status.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|entry| entry.status().is_active())
            .count()
    }

    /// Sum of the smoothed speeds of every downloading task, in bytes/sec.
    #[must_use]
    pub fn aggregate_speed(&self) -> f64 {
        self.tasks
            .iter()
            .filter_map(|entry| {
                let snapshot = entry.receiver.borrow();
                (snapshot.status == TaskStatus::Downloading).then_some(snapshot.speed)
            })
            .sum()
    }

    /// Removes one terminal task and returns its final snapshot.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::UnknownTask`] if `id` is not registered
    /// - [`ManagerError::TaskStillActive`] if the task has not finished
    pub fn dispose(&self, id: TaskId) -> Result<TaskSnapshot, ManagerError> {
        match self
            .tasks
            .remove_if(&id, |_, entry| entry.status().is_terminal())
        {
            Some((_, entry)) => {
                debug!(task_id = %id, "task disposed");
                Ok(entry.snapshot())
            }
            None if self.tasks.contains_key(&id) => Err(ManagerError::TaskStillActive(id)),
            None => Err(ManagerError::UnknownTask(id)),
        }
    }

    /// Removes every terminal task; returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, entry| entry.status().is_active());
        let removed = before.saturating_sub(self.tasks.len());
        if removed > 0 {
            debug!(removed, "pruned finished tasks");
        }
        removed
    }

    /// Number of registered tasks, finished or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Checks a submission before it is registered.
///
/// # Errors
///
/// - [`ManagerError::EmptyUrl`] for a blank URL
/// - [`ManagerError::InvalidUrl`] if the URL does not parse or has no host
/// - [`ManagerError::UnsupportedScheme`] for anything but http/https
/// - [`ManagerError::EmptyDestination`] for an empty destination path
pub fn validate_request(request: &DownloadRequest) -> Result<(), ManagerError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ManagerError::EmptyUrl);
    }

    let parsed = Url::parse(url).map_err(|e| ManagerError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ManagerError::UnsupportedScheme {
            scheme: parsed.scheme().to_string(),
        });
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ManagerError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    if request.destination.as_os_str().is_empty() {
        return Err(ManagerError::EmptyDestination);
    }

    Ok(())
}
