//! One CLI run: submit every URL, render progress, report, pick the exit code.

use std::collections::HashSet;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use litefetch_core::download::{default_destination_name, numbered_name};
use litefetch_core::{DownloadManager, DownloadRequest, TaskStatus};
use tracing::{debug, info, warn};

use super::config_runtime::RunSettings;
use super::{exit_handler, output, progress_manager, terminal};
use crate::ProcessExit;
use crate::app_config::FileConfig;
use crate::cli::Args;

pub(crate) async fn run_litefetch(args: Args, file_config: Option<FileConfig>) -> Result<ProcessExit> {
    if args.urls.is_empty() {
        info!("No URLs provided. Pass one or more http(s) URLs as arguments.");
        info!("Example: litefetch https://example.com/file.iso");
        return Ok(ProcessExit::Success);
    }
    if args.output.is_some() && args.urls.len() > 1 {
        bail!("--output can only be used with a single URL; use --output-dir for several");
    }

    let settings = RunSettings::resolve(&args, file_config.as_ref());
    debug!(?settings, "resolved run settings");

    let manager = DownloadManager::new(settings.engine.clone())
        .context("Failed to start the download manager")?;

    let mut ids = Vec::with_capacity(args.urls.len());
    let mut taken = HashSet::new();
    for url in &args.urls {
        let destination = match &args.output {
            Some(path) => path.clone(),
            None => unique_destination(&settings.output_dir, url, &mut taken),
        };
        let request = DownloadRequest::new(url.as_str(), destination)
            .with_max_retries(settings.max_retries)
            .with_segments(args.segments);
        let id = manager
            .submit_request(request)
            .with_context(|| format!("Failed to submit '{url}'"))?;
        ids.push(id);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    let signal_manager = manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
            let cancelled = signal_manager.cancel_all();
            warn!(cancelled, "interrupted, cancelling downloads");
        }
    });

    let use_bars = terminal::should_use_progress_bars(
        io::stderr().is_terminal(),
        args.quiet,
        args.json,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) = progress_manager::spawn_progress_ui(
        use_bars,
        manager.clone(),
        ids.clone(),
        settings.poll_interval,
    );

    let mut finals = Vec::with_capacity(ids.len());
    for id in &ids {
        finals.push(manager.wait(*id).await?);
    }

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let completed = count(&finals, TaskStatus::Complete);
    let failed = count(&finals, TaskStatus::Error);
    let cancelled = count(&finals, TaskStatus::Cancelled);
    info!(completed, failed, cancelled, total = finals.len(), "Downloads finished");

    let stdout = io::stdout();
    output::write_summary(&mut stdout.lock(), &finals, args.json)?;

    Ok(exit_handler::determine_exit_outcome(
        completed,
        failed + cancelled,
        interrupted.load(Ordering::SeqCst),
    ))
}

/// Default destination under `dir`, numbered when an earlier URL in this run
/// already claimed the same name.
fn unique_destination(dir: &Path, url: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let name = default_destination_name(url);
    let mut candidate = dir.join(&name);
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = dir.join(numbered_name(&name, n));
        n += 1;
    }
    if n > 2 {
        debug!(url, destination = %candidate.display(), "renamed duplicate destination");
    }
    taken.insert(candidate.clone());
    candidate
}

fn count(snapshots: &[litefetch_core::TaskSnapshot], status: TaskStatus) -> usize {
    snapshots.iter().filter(|s| s.status == status).count()
}
