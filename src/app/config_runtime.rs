//! Merges CLI flags, the config file and built-in defaults into run settings.
//!
//! Precedence: CLI flag > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use litefetch_core::download::constants::SAMPLE_INTERVAL;
use litefetch_core::{DEFAULT_MAX_RETRIES, EngineConfig};

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Everything a run needs after precedence has been applied.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) engine: EngineConfig,
    pub(crate) output_dir: PathBuf,
    pub(crate) max_retries: u32,
    pub(crate) poll_interval: Duration,
}

impl RunSettings {
    pub(crate) fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let mut engine = EngineConfig::default();
        if let Some(secs) = file.probe_timeout_secs {
            engine = engine.with_probe_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.transfer_timeout_secs {
            engine = engine.with_transfer_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = file.user_agent {
            engine = engine.with_user_agent(user_agent);
        }
        if let Some(enabled) = file.retry_permanent_failures {
            engine = engine.with_retry_permanent_failures(enabled);
        }
        if let Some(temp_dir) = args.temp_dir.clone().or(file.temp_dir) {
            engine = engine.with_temp_dir(temp_dir);
        }

        let max_retries = args
            .max_retries
            .or(file.max_retries)
            .map_or(DEFAULT_MAX_RETRIES, u32::from);
        let poll_interval = args
            .poll_interval_ms
            .or(file.poll_interval_ms)
            .map_or(SAMPLE_INTERVAL, Duration::from_millis);
        let output_dir = args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            engine,
            output_dir,
            max_retries,
            poll_interval,
        }
    }
}
