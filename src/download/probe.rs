//! Server capability probing.
//!
//! Before a transfer starts, the engine asks the server what it supports
//! without downloading the body: a HEAD request first, then a tiny ranged GET
//! when HEAD is refused. Probing never fails a task; a probe that cannot reach
//! the server only leaves an advisory message behind.

use std::fmt;
use std::time::{Duration, SystemTime};

use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap,
    LAST_MODIFIED, SERVER,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, header_str, header_u64};
use super::constants::PROBE_RANGE;
use super::filename::{parse_content_disposition, sanitize_filename};
use crate::format::format_bytes;

/// What the server told us about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerCapabilities {
    /// `Accept-Ranges` contains `bytes`, or the ranged GET answered 206.
    pub supports_range_requests: bool,
    /// The HEAD request succeeded.
    pub supports_head_requests: bool,
    /// Declared size in bytes, 0 when unknown.
    pub content_length: u64,
    /// Raw `Content-Type`, empty when absent.
    pub content_type: String,
    /// Sanitized filename from `Content-Disposition`.
    pub filename: Option<String>,
    /// Raw `Server` header, `"Unknown"` when HEAD succeeded without one.
    pub server_info: String,
    /// Raw `Last-Modified` header.
    pub last_modified: Option<String>,
    /// Raw `Accept-Ranges` header, empty when absent.
    pub accept_ranges: String,
}

impl ServerCapabilities {
    /// Parses [`last_modified`](Self::last_modified) as an HTTP-date.
    #[must_use]
    pub fn last_modified_time(&self) -> Option<SystemTime> {
        self.last_modified
            .as_deref()
            .and_then(|raw| httpdate::parse_http_date(raw).ok())
    }

    fn from_head_headers(headers: &HeaderMap) -> Self {
        let accept_ranges = header_str(headers, ACCEPT_RANGES)
            .unwrap_or_default()
            .to_string();
        Self {
            supports_range_requests: accept_ranges.to_ascii_lowercase().contains("bytes"),
            supports_head_requests: true,
            content_length: header_u64(headers, CONTENT_LENGTH).unwrap_or(0),
            content_type: header_str(headers, CONTENT_TYPE)
                .unwrap_or_default()
                .to_string(),
            filename: header_str(headers, CONTENT_DISPOSITION)
                .and_then(parse_content_disposition)
                .map(|name| sanitize_filename(&name)),
            server_info: header_str(headers, SERVER)
                .unwrap_or("Unknown")
                .to_string(),
            last_modified: header_str(headers, LAST_MODIFIED).map(ToString::to_string),
            accept_ranges,
        }
    }
}

impl fmt::Display for ServerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = if self.content_length > 0 {
            format_bytes(self.content_length)
        } else {
            "unknown".to_string()
        };
        let content_type = if self.content_type.is_empty() {
            "unknown"
        } else {
            &self.content_type
        };
        write!(
            f,
            "range support: {}, size: {size}, type: {content_type}",
            if self.supports_range_requests { "yes" } else { "no" }
        )
    }
}

/// Outcome of a probe.
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    /// Capabilities gathered so far (defaults when nothing answered).
    pub capabilities: ServerCapabilities,
    /// Total size discovered by the probe, 0 when unknown.
    pub file_size: u64,
    /// Set when neither probe request produced an answer.
    pub advisory: Option<String>,
}

/// Probes `url` with HEAD, falling back to `GET Range: bytes=0-1023`.
///
/// A HEAD transport error, timeout or non-2xx status (405 is common)
/// triggers the fallback. When the fallback answers 206 the server supports
/// ranges and the total size is taken from `Content-Range`. The fallback body
/// is dropped unread.
#[instrument(skip(client, timeout), fields(url = %url))]
pub async fn probe_capabilities(client: &HttpClient, url: &str, timeout: Duration) -> ProbeReport {
    match client.head(url, timeout).await {
        Ok(response) => {
            let capabilities = ServerCapabilities::from_head_headers(response.headers());
            info!(%capabilities, server = %capabilities.server_info, "server analysed");
            ProbeReport {
                file_size: capabilities.content_length,
                capabilities,
                advisory: None,
            }
        }
        Err(head_error) => {
            debug!(error = %head_error, "HEAD failed, trying ranged GET");
            probe_with_range(client, url, timeout).await
        }
    }
}

async fn probe_with_range(client: &HttpClient, url: &str, timeout: Duration) -> ProbeReport {
    let mut report = ProbeReport::default();
    match client.get_range(url, PROBE_RANGE, timeout).await {
        Ok(response) => {
            if response.status() == StatusCode::PARTIAL_CONTENT {
                report.capabilities.supports_range_requests = true;
                if let Some(total) = header_str(response.headers(), CONTENT_RANGE)
                    .and_then(parse_content_range_total)
                {
                    report.capabilities.content_length = total;
                    report.file_size = total;
                }
            }
            info!(
                status = response.status().as_u16(),
                capabilities = %report.capabilities,
                "server analysed via ranged GET"
            );
        }
        Err(error) => {
            warn!(error = %error, "server analysis failed");
            report.advisory = Some(format!("server analysis failed: {error}"));
        }
    }
    report
}

/// Extracts the total from `Content-Range: bytes <a>-<b>/<total>`.
///
/// Returns `None` for an unknown (`*`) or malformed total.
#[must_use]
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    let total = total.trim();
    if total.is_empty() || !total.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    total.parse().ok()
}
