//! Application configuration loading for CLI defaults.
//!
//! The file uses a flat `key = value` subset of TOML: strings are
//! double-quoted, integers and booleans are bare, `#` starts a comment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// File configuration for litefetch defaults. Every field is optional; CLI
/// flags override whatever is set here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default output directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Default retry ceiling (same range as CLI).
    pub max_retries: Option<u8>,
    /// Probe request timeout in seconds.
    pub probe_timeout_secs: Option<u64>,
    /// Connect and per-read transfer timeout in seconds.
    pub transfer_timeout_secs: Option<u64>,
    /// Progress polling interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Directory for in-progress temp files.
    pub temp_dir: Option<PathBuf>,
    /// Keep retrying failures classified as permanent.
    pub retry_permanent_failures: Option<bool>,
    /// User-Agent header for every request.
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 0..=10");
        }
        validate_timeout_secs("probe_timeout_secs", self.probe_timeout_secs)?;
        validate_timeout_secs("transfer_timeout_secs", self.transfer_timeout_secs)?;
        if let Some(poll) = self.poll_interval_ms
            && !(50..=10_000).contains(&poll)
        {
            bail!("Invalid config value for `poll_interval_ms`: {poll}. Expected range: 50..=10000");
        }
        if let Some(user_agent) = self.user_agent.as_deref()
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/litefetch/config.toml`
/// 2. `$HOME/.config/litefetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("litefetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("litefetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "max_retries" => {
                let parsed = parse_integer_u8(value)
                    .with_context(|| format!("Invalid `max_retries` value on line {line_no}"))?;
                cfg.max_retries = Some(parsed);
            }
            "probe_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `probe_timeout_secs` value on line {line_no}")
                })?;
                cfg.probe_timeout_secs = Some(parsed);
            }
            "transfer_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `transfer_timeout_secs` value on line {line_no}")
                })?;
                cfg.transfer_timeout_secs = Some(parsed);
            }
            "poll_interval_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `poll_interval_ms` value on line {line_no}")
                })?;
                cfg.poll_interval_ms = Some(parsed);
            }
            "temp_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `temp_dir` value on line {line_no}"))?;
                cfg.temp_dir = Some(PathBuf::from(parsed));
            }
            "retry_permanent_failures" => {
                let parsed = parse_boolean(value).with_context(|| {
                    format!("Invalid `retry_permanent_failures` value on line {line_no}")
                })?;
                cfg.retry_permanent_failures = Some(parsed);
            }
            "user_agent" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `user_agent` value on line {line_no}"))?;
                cfg.user_agent = Some(parsed);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
