//! CLI entry point for litefetch.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod app_config;
mod cli;

use cli::Args;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every download completed.
    Success,
    /// Some downloads completed, some did not.
    Partial,
    /// No download completed.
    Failure,
    /// Ctrl-C cancelled the run.
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::from(1),
            Self::Partial => ExitCode::from(2),
            Self::Interrupted => ExitCode::from(130),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    app::terminal::init_tracing(
        args.default_log_level(),
        app::terminal::no_color_env_requested(),
    );

    debug!(?args, "CLI arguments parsed");
    info!("litefetch starting");

    let loaded = app_config::load_default_file_config()?;
    if let Some(path) = loaded.path.as_deref()
        && loaded.config.is_some()
    {
        debug!(path = %path.display(), "loaded config file");
    }

    let outcome = app::run_litefetch(args, loaded.config).await?;
    Ok(outcome.code())
}
