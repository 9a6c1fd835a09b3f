//! Progress UI (one bar per task) driven by polling task snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use litefetch_core::{DownloadManager, TaskId, TaskSnapshot};

const BAR_TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {msg}";

/// Spawns the progress UI when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_bars` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_bars: bool,
    manager: DownloadManager,
    ids: Vec<TaskId>,
    poll_interval: Duration,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_bars {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_bars_inner(manager, ids, poll_interval, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_bars_inner(
    manager: DownloadManager,
    ids: Vec<TaskId>,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bars: Vec<(TaskId, ProgressBar)> = ids
            .into_iter()
            .map(|id| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(style.clone());
                bar.set_prefix(id.to_string());
                (id, bar)
            })
            .collect();

        loop {
            let mut all_finished = true;
            for (id, bar) in &bars {
                if bar.is_finished() {
                    continue;
                }
                let Some(snapshot) = manager.snapshot(*id) else {
                    bar.finish_and_clear();
                    continue;
                };
                render(bar, &snapshot);
                if snapshot.status.is_terminal() {
                    bar.finish();
                } else {
                    all_finished = false;
                }
            }

            if all_finished || stop.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }

        for (_, bar) in &bars {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    })
}

fn render(bar: &ProgressBar, snapshot: &TaskSnapshot) {
    if snapshot.file_size > 0 {
        bar.set_length(snapshot.file_size);
        bar.set_position(snapshot.downloaded_bytes.min(snapshot.file_size));
    }
    bar.set_message(snapshot.status_line());
}

#[cfg(test)]
mod tests {
    use super::spawn_progress_ui;
    use litefetch_core::{DownloadManager, EngineConfig};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test]
    async fn spawn_progress_ui_when_disabled_returns_none_handle_and_stop_already_true() {
        let manager = DownloadManager::new(EngineConfig::default()).unwrap();

        let (handle, stop) = spawn_progress_ui(false, manager, Vec::new(), Duration::from_millis(50));

        assert!(handle.is_none());
        assert!(
            stop.load(Ordering::SeqCst),
            "stop signal should be true when bars are disabled"
        );
    }

    #[tokio::test]
    async fn spawn_progress_ui_with_no_tasks_exits_on_its_own() {
        let manager = DownloadManager::new(EngineConfig::default()).unwrap();

        let (handle, stop) = spawn_progress_ui(true, manager, Vec::new(), Duration::from_millis(50));

        assert!(!stop.load(Ordering::SeqCst), "stop should be false initially");
        // no bars: every bar is trivially finished, so the task ends without a stop signal
        handle.unwrap().await.unwrap();
    }
}
