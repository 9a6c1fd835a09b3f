#![allow(dead_code)]

pub mod stalling_server;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use litefetch_core::EngineConfig;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Set to `1`/`true` to turn a missing loopback socket into a test failure.
const STRICT_SOCKETS_ENV: &str = "LITEFETCH_REQUIRE_SOCKET_TESTS";

/// `true` when 127.0.0.1 cannot be bound, e.g. in a network-less sandbox.
///
/// Tests that need a local server return early in that case, unless
/// `LITEFETCH_REQUIRE_SOCKET_TESTS` is set, which makes them panic instead.
#[track_caller]
pub fn loopback_unavailable() -> bool {
    if std::net::TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let caller = std::panic::Location::caller();
    let strict = std::env::var(STRICT_SOCKETS_ENV)
        .is_ok_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    assert!(
        !strict,
        "{caller}: loopback bind failed and {STRICT_SOCKETS_ENV} is set"
    );
    eprintln!("{caller}: loopback bind failed, test skipped");
    true
}

/// A started wiremock server, or `None` when loopback is unavailable.
#[track_caller]
pub fn local_mock_server() -> impl Future<Output = Option<MockServer>> {
    let skip = loopback_unavailable();
    async move {
        if skip {
            None
        } else {
            Some(MockServer::start().await)
        }
    }
}

/// Engine configuration for tests: temp files under `temp_dir`, 10 ms
/// backoff unit and a sample on every chunk.
pub fn test_config(temp_dir: &std::path::Path) -> EngineConfig {
    EngineConfig::default()
        .with_temp_dir(temp_dir)
        .with_backoff_unit(Duration::from_millis(10))
        .with_sample_interval(Duration::ZERO)
        .with_probe_timeout(Duration::from_secs(5))
}

/// Fails the first `failures` requests with `status`, then serves `body`.
#[derive(Clone)]
pub struct FlakyResponder {
    calls: Arc<AtomicUsize>,
    failures: usize,
    status: u16,
    body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(failures: usize, status: u16, body: Vec<u8>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failures,
            status,
            body,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ResponseTemplate::new(self.status)
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.body.clone())
        }
    }
}

/// Number of entries in `dir`, 0 if it does not exist.
pub fn entries_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| entries.count())
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
