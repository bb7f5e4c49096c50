//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup for Microsoft Graph API endpoints.
//! Each helper mounts the necessary mock endpoints; clients are configured
//! with a short backoff so retry tests stay fast.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use oneup_graph::auth::StaticTokenProvider;
use oneup_graph::client::GraphClient;
use oneup_graph::retry::RetryPolicy;

pub const TEST_TOKEN: &str = "test-access-token";

/// Initial backoff used by test clients
pub const TEST_BACKOFF: Duration = Duration::from_millis(10);

/// Builds a client for `base_url` with 3 attempts and a 10ms initial backoff
pub fn test_client(base_url: &str) -> GraphClient {
    GraphClient::new(
        Arc::new(StaticTokenProvider::new(TEST_TOKEN)),
        Duration::from_secs(5),
    )
    .expect("build client")
    .with_base_url(base_url)
    .with_retry_policy(RetryPolicy::new(3, TEST_BACKOFF))
}

/// Starts a mock server and returns a (MockServer, GraphClient) tuple.
///
/// Pre-configured endpoints:
/// - GET /me/drive/root → drive root item
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_item("root-001", "root", 0)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    (server, client)
}

/// JSON body of a file DriveItem
pub fn drive_item(id: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "size": size,
        "lastModifiedDateTime": "2026-01-15T10:00:00Z",
        "parentReference": {
            "id": "parent-001",
            "path": "/drive/root:/Backup"
        },
        "file": {
            "hashes": {
                "quickXorHash": "AAAAAAAAAAAAAAAAAAAAAAAAAAA="
            }
        }
    })
}

/// JSON body of a folder DriveItem
pub fn folder_item(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "folder": { "childCount": 0 }
    })
}

/// Mounts a small file upload endpoint that accepts PUT requests.
pub async fn mount_upload_small(
    server: &MockServer,
    remote_path: &str,
    response_id: &str,
    response_name: &str,
) {
    // PUT /me/drive/root:/{path}:/content
    let path_str = format!("/me/drive/root:{}:/content", remote_path);
    Mock::given(method("PUT"))
        .and(path(&path_str))
        .respond_with(ResponseTemplate::new(201).set_body_json(drive_item(
            response_id,
            response_name,
            1024,
        )))
        .mount(server)
        .await;
}

/// Matches requests that carry no Authorization header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}
