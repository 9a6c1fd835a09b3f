//! HTTP client wrapper used by the prober and the transfer executor.
//!
//! One [`HttpClient`] is built per engine and shared by every task, so all
//! downloads reuse the same connection pool.

use reqwest::header::{HeaderMap, HeaderName, RANGE, USER_AGENT};
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::{debug, instrument};

use super::config::EngineConfig;
use super::error::DownloadError;

/// HTTP client configured from an [`EngineConfig`].
///
/// Transfer requests are bounded by the connect timeout and a per-read
/// timeout, so a slow but steady body never trips a total deadline. Probe
/// requests carry their own total timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn from_config(config: &EngineConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.transfer_timeout)
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Sends a HEAD request (redirects followed) bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Transport failures, timeouts and non-2xx statuses.
    pub(crate) async fn head(&self, url: &str, timeout: Duration) -> Result<Response, DownloadError> {
        self.send_request(Method::HEAD, url, None, Some(timeout))
            .await
    }

    /// Sends a GET carrying a `Range` header, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Transport failures, timeouts and non-2xx statuses.
    pub(crate) async fn get_range(
        &self,
        url: &str,
        range: &str,
        timeout: Duration,
    ) -> Result<Response, DownloadError> {
        self.send_request(Method::GET, url, Some(range), Some(timeout))
            .await
    }

    /// Sends a plain GET for a full-body transfer.
    ///
    /// # Errors
    ///
    /// Transport failures, timeouts and non-2xx statuses.
    pub(crate) async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        self.send_request(Method::GET, url, None, None).await
    }

    #[instrument(level = "debug", skip(self), fields(method = %method))]
    async fn send_request(
        &self,
        method: Method,
        url: &str,
        range_header: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Response, DownloadError> {
        let mut request = self
            .client
            .request(method, url)
            .header(USER_AGENT, &self.user_agent);
        if let Some(range) = range_header {
            request = request.header(RANGE, range);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "non-success response");
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }
}

/// Returns a header value as a trimmed string, if present and valid ASCII.
pub(crate) fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Parses a numeric header such as `Content-Length`.
///
/// The raw header is read rather than the body size hint, which is zero for
/// HEAD responses.
pub(crate) fn header_u64(headers: &HeaderMap, name: HeaderName) -> Option<u64> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}
