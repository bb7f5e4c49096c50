//! Integration tests for the retry-wrapped transport
//!
//! Verifies which failures are retried, how many attempts are made,
//! the backoff between them and how exhaustion is reported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use oneup_core::domain::newtypes::RemotePath;
use oneup_graph::auth::StaticTokenProvider;
use oneup_graph::client::{GraphClient, RequestAuth};
use oneup_graph::{items, upload, GraphError};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

fn remote(path: &str) -> RemotePath {
    RemotePath::new(path.to_string()).unwrap()
}

#[tokio::test]
async fn test_always_503_exhausts_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me/drive/root:/Backup/a.txt:/content"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let started = Instant::now();
    let result = upload::upload_small(&client, &remote("/Backup/a.txt"), b"data".to_vec()).await;
    let elapsed = started.elapsed();

    match result {
        Err(GraphError::RetriesExhausted {
            operation,
            attempts,
            last_error,
        }) => {
            assert_eq!(operation, "upload_small");
            assert_eq!(attempts, 3);
            assert_eq!(last_error, "HTTP 503");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }

    // Delays of INITIAL and 2×INITIAL between the three attempts
    assert!(elapsed >= common::TEST_BACKOFF * 3, "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_transient_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Backup"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Backup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_item("F1", "Backup")))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let exists = items::item_exists(&client, &remote("/Backup")).await.unwrap();
    assert!(exists);
}

#[tokio::test]
async fn test_429_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/ITEM1"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/ITEM1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let id = "ITEM1".parse().unwrap();
    let outcome = items::delete_item(&client, &id).await.unwrap();
    assert_eq!(outcome, oneup_core::ports::DeleteOutcome::Deleted);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me/drive/root:/Backup/a.txt:/content"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalidRequest"))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let err = upload::upload_small(&client, &remote("/Backup/a.txt"), b"x".to_vec())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    match err {
        GraphError::Rejected { body, .. } => assert_eq!(body, "invalidRequest"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_exhausts() {
    // Nothing listens on port 1
    let client = common::test_client("http://127.0.0.1:1");
    let err = items::verify_access(&client).await.unwrap_err();
    assert!(err.is_exhausted(), "got {err:?}");
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root"))
        .and(header("authorization", format!("Bearer {}", common::TEST_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_item("root", "root")))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    items::verify_access(&client).await.unwrap();
}

#[tokio::test]
async fn test_token_failure_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = GraphClient::new(
        Arc::new(StaticTokenProvider::new("")),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_base_url(server.uri());

    let err = items::verify_access(&client).await.unwrap_err();
    assert!(matches!(err, GraphError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn test_execute_returns_non_transient_response_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/anything"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let url = client.url("/anything");
    let response = client
        .execute("ping", RequestAuth::None, |http| http.get(&url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn test_request_body_resent_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me/drive/root:/a.bin:/content"))
        .and(wiremock::matchers::body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/me/drive/root:/a.bin:/content"))
        .and(wiremock::matchers::body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::drive_item("A1", "a.bin", 7)))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::test_client(&server.uri());
    let item = upload::upload_small(&client, &remote("/a.bin"), b"payload".to_vec())
        .await
        .unwrap();
    assert_eq!(item.id.as_str(), "A1");
}
