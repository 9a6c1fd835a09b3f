//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download files over HTTP(S) with retries and live progress.
///
/// Each URL is probed, streamed to a temporary file and moved onto its
/// destination once complete. Ctrl-C cancels every running download.
#[derive(Parser, Debug)]
#[command(name = "litefetch")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download
    pub urls: Vec<String>,

    /// Destination file (only valid with a single URL)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for downloads when --output is not given [default: .]
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for in-progress temporary files [default: system temp dir]
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Maximum retries per download (0-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: Option<u8>,

    /// Requested connections per download; values above 1 fall back to 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=16))]
    pub segments: u32,

    /// Progress refresh interval in milliseconds (50-10000) [default: 500]
    #[arg(long, value_parser = clap::value_parser!(u64).range(50..=10_000))]
    pub poll_interval_ms: Option<u64>,

    /// Print final task snapshots as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default tracing level for the flags given.
    ///
    /// Priority: quiet flag > verbose flag > default (info). `RUST_LOG`
    /// overrides all of these at subscriber setup.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["litefetch"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.json);
        assert_eq!(args.segments, 1);
        assert_eq!(args.max_retries, None);
        assert_eq!(args.output, None);
    }

    #[test]
    fn test_cli_positional_urls() {
        let args =
            Args::try_parse_from(["litefetch", "https://a.example/x", "https://b.example/y"])
                .unwrap();
        assert_eq!(args.urls.len(), 2);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["litefetch", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["litefetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn test_cli_quiet_flag_sets_error_level() {
        let args = Args::try_parse_from(["litefetch", "--quiet"]).unwrap();
        assert!(args.quiet);
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Args::try_parse_from(["litefetch", "-q", "-v"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["litefetch", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["litefetch", "--version"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["litefetch", "--invalid-flag"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
    }

    // ==================== Max Retries Tests ====================

    #[test]
    fn test_cli_max_retries_short_and_long_flag() {
        let args = Args::try_parse_from(["litefetch", "-r", "5"]).unwrap();
        assert_eq!(args.max_retries, Some(5));
        let args = Args::try_parse_from(["litefetch", "--max-retries", "0"]).unwrap();
        assert_eq!(args.max_retries, Some(0));
    }

    #[test]
    fn test_cli_max_retries_over_max_rejected() {
        let result = Args::try_parse_from(["litefetch", "-r", "11"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    // ==================== Output Tests ====================

    #[test]
    fn test_cli_output_and_output_dir() {
        let args = Args::try_parse_from([
            "litefetch",
            "-o",
            "/tmp/file.iso",
            "-d",
            "/tmp/downloads",
            "https://example.com/file.iso",
        ])
        .unwrap();
        assert_eq!(args.output, Some(PathBuf::from("/tmp/file.iso")));
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/downloads")));
    }

    #[test]
    fn test_cli_segments_range() {
        let args = Args::try_parse_from(["litefetch", "--segments", "4"]).unwrap();
        assert_eq!(args.segments, 4);
        assert!(Args::try_parse_from(["litefetch", "--segments", "0"]).is_err());
    }

    #[test]
    fn test_cli_poll_interval_range() {
        let args = Args::try_parse_from(["litefetch", "--poll-interval-ms", "100"]).unwrap();
        assert_eq!(args.poll_interval_ms, Some(100));
        assert!(Args::try_parse_from(["litefetch", "--poll-interval-ms", "10"]).is_err());
    }
}
