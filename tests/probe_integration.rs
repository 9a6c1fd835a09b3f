//! Integration tests for server capability probing.

mod support;

use std::time::Duration;

use litefetch_core::download::{EngineConfig, HttpClient, probe_capabilities};
use support::local_mock_server;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn client() -> HttpClient {
    HttpClient::from_config(&EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn test_probe_head_reports_size_and_headers() {
    let Some(server) = local_mock_server().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 1000])
                .insert_header("Content-Type", "application/octet-stream")
                .insert_header("Server", "test-origin")
                .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
        )
        .mount(&server)
        .await;

    let report =
        probe_capabilities(&client(), &format!("{}/file.bin", server.uri()), PROBE_TIMEOUT).await;

    assert_eq!(report.file_size, 1000);
    assert!(report.advisory.is_none());
    let caps = &report.capabilities;
    assert_eq!(caps.content_length, 1000);
    assert!(caps.supports_head_requests);
    assert!(!caps.supports_range_requests);
    assert_eq!(caps.content_type, "application/octet-stream");
    assert_eq!(caps.server_info, "test-origin");
    assert!(caps.last_modified_time().is_some());
}

#[tokio::test]
async fn test_probe_head_accept_ranges_and_filename() {
    let Some(server) = local_mock_server().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 64])
                .insert_header("Accept-Ranges", "bytes")
                .insert_header("Content-Disposition", "attachment; filename=\"report.pdf\""),
        )
        .mount(&server)
        .await;

    let report =
        probe_capabilities(&client(), &format!("{}/download", server.uri()), PROBE_TIMEOUT).await;

    assert!(report.capabilities.supports_range_requests);
    assert_eq!(report.capabilities.accept_ranges, "bytes");
    assert_eq!(report.capabilities.filename.as_deref(), Some("report.pdf"));
}

#[tokio::test]
async fn test_probe_falls_back_to_ranged_get_when_head_rejected() {
    let Some(server) = local_mock_server().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/big.iso"))
        .and(header("range", "bytes=0-1023"))
        .respond_with(
            ResponseTemplate::new(206)
                .set_body_bytes(vec![0u8; 1024])
                .insert_header("Content-Range", "bytes 0-1023/5000"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report =
        probe_capabilities(&client(), &format!("{}/big.iso", server.uri()), PROBE_TIMEOUT).await;

    assert_eq!(report.file_size, 5000);
    assert_eq!(report.capabilities.content_length, 5000);
    assert!(report.capabilities.supports_range_requests);
    assert!(!report.capabilities.supports_head_requests);
    assert!(report.advisory.is_none());
}

#[tokio::test]
async fn test_probe_ranged_get_full_body_means_no_range_support() {
    let Some(server) = local_mock_server().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
        .mount(&server)
        .await;

    let report =
        probe_capabilities(&client(), &format!("{}/plain", server.uri()), PROBE_TIMEOUT).await;

    assert!(!report.capabilities.supports_range_requests);
    assert_eq!(report.file_size, 0);
    assert!(report.advisory.is_none());
}

#[tokio::test]
async fn test_probe_unreachable_server_sets_advisory() {
    // Bind then drop to get a local port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0");
    let Ok(listener) = listener else {
        return;
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let report =
        probe_capabilities(&client(), &format!("http://{addr}/gone.bin"), PROBE_TIMEOUT).await;

    assert_eq!(report.file_size, 0);
    let advisory = report.advisory.unwrap();
    assert!(advisory.starts_with("server analysis failed"), "{advisory}");
}
