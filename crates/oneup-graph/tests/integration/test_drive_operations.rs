//! Integration tests for drive operations
//!
//! Verifies folder probing and creation, simple and chunked uploads,
//! timestamp patches and deletions against a wiremock Graph API server,
//! both directly and through the `ICloudProvider` port.

use chrono::{TimeZone, Utc};
use oneup_core::domain::newtypes::{RemoteId, RemotePath};
use oneup_core::domain::transfer::ByteRange;
use oneup_core::ports::{ChunkOutcome, DeleteOutcome, ICloudProvider};
use oneup_graph::provider::GraphCloudProvider;
use oneup_graph::{items, upload, GraphError};
use wiremock::{
    matchers::{body_bytes, body_partial_json, header, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

fn remote(path: &str) -> RemotePath {
    RemotePath::new(path.to_string()).unwrap()
}

fn id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

// ============================================================================
// Folder tests
// ============================================================================

#[tokio::test]
async fn test_item_exists_true_and_false() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Backup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_item("F1", "Backup")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    assert!(items::item_exists(&client, &remote("/Backup")).await.unwrap());
    assert!(!items::item_exists(&client, &remote("/Missing")).await.unwrap());
}

#[tokio::test]
async fn test_create_folder_under_root() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("POST"))
        .and(path("/me/drive/root/children"))
        .and(body_partial_json(serde_json::json!({
            "name": "Backup",
            "folder": {},
            "@microsoft.graph.conflictBehavior": "replace"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::folder_item("F1", "Backup")))
        .expect(1)
        .mount(&server)
        .await;

    let item = items::create_folder(&client, &remote("/Backup")).await.unwrap();
    assert_eq!(item.id.as_str(), "F1");
    assert_eq!(item.name, "Backup");
    assert!(item.size.is_none());
}

#[tokio::test]
async fn test_create_nested_folder() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("POST"))
        .and(path("/me/drive/root:/Backup/My%20Docs:/children"))
        .and(body_partial_json(serde_json::json!({ "name": "2024" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::folder_item("F2", "2024")))
        .expect(1)
        .mount(&server)
        .await;

    let item = items::create_folder(&client, &remote("/Backup/My Docs/2024"))
        .await
        .unwrap();
    assert_eq!(item.id.as_str(), "F2");
}

#[tokio::test]
async fn test_create_root_folder_is_refused() {
    let (_server, client) = common::setup_graph_mock().await;
    assert!(items::create_folder(&client, &RemotePath::root()).await.is_err());
}

// ============================================================================
// Upload tests
// ============================================================================

#[tokio::test]
async fn test_upload_small_file() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_upload_small(&server, "/Backup/test.txt", "upload-001", "test.txt").await;

    let item = upload::upload_small(&client, &remote("/Backup/test.txt"), b"hello".to_vec())
        .await
        .expect("Upload failed");

    assert_eq!(item.id.as_str(), "upload-001");
    assert_eq!(item.name, "test.txt");
}

#[tokio::test]
async fn test_create_upload_session_replace() {
    let (server, client) = common::setup_graph_mock().await;
    let upload_url = format!("{}/upload/session-1", server.uri());
    Mock::given(method("POST"))
        .and(path("/me/drive/root:/Backup/big.bin:/createUploadSession"))
        .and(body_partial_json(serde_json::json!({
            "item": { "@microsoft.graph.conflictBehavior": "replace" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url,
            "expirationDateTime": "2026-01-15T10:15:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = upload::create_upload_session(&client, &remote("/Backup/big.bin"), 1000)
        .await
        .unwrap();
    assert_eq!(session.upload_url, upload_url);
    assert_eq!(session.total_size, 1000);
    assert_eq!(session.bytes_confirmed, 0);
    assert!(session.expires_at.is_some());
}

#[tokio::test]
async fn test_upload_chunks_continue_then_complete() {
    let (server, client) = common::setup_graph_mock().await;
    let session = oneup_core::domain::transfer::UploadSession::new(
        format!("{}/upload/session-1", server.uri()),
        10,
        None,
    );

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("content-range", "bytes 0-5/10"))
        .and(common::NoAuthorization)
        .and(body_bytes(b"012345".to_vec()))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "nextExpectedRanges": ["6-"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("content-range", "bytes 6-9/10"))
        .and(common::NoAuthorization)
        .respond_with(ResponseTemplate::new(201).set_body_json(common::drive_item("BIG1", "big.bin", 10)))
        .expect(1)
        .mount(&server)
        .await;

    let first = upload::upload_chunk(&client, &session, ByteRange::new(0, 5).unwrap(), b"012345".to_vec())
        .await
        .unwrap();
    assert_eq!(first, ChunkOutcome::Continue);

    let last = upload::upload_chunk(&client, &session, ByteRange::new(6, 9).unwrap(), b"6789".to_vec())
        .await
        .unwrap();
    match last {
        ChunkOutcome::Complete(item) => assert_eq!(item.id.as_str(), "BIG1"),
        other => panic!("expected Complete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_chunk_unexpected_status_is_fatal() {
    let (server, client) = common::setup_graph_mock().await;
    let session = oneup_core::domain::transfer::UploadSession::new(
        format!("{}/upload/session-2", server.uri()),
        4,
        None,
    );
    Mock::given(method("PUT"))
        .and(path("/upload/session-2"))
        .respond_with(ResponseTemplate::new(416).set_body_string("rangeNotSatisfiable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = upload::upload_chunk(&client, &session, ByteRange::new(0, 3).unwrap(), b"abcd".to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(416));
}

#[tokio::test]
async fn test_upload_chunk_permanent_redirect_continues() {
    let (server, client) = common::setup_graph_mock().await;
    let session = oneup_core::domain::transfer::UploadSession::new(
        format!("{}/upload/session-308", server.uri()),
        8,
        None,
    );
    Mock::given(method("PUT"))
        .and(path("/upload/session-308"))
        .and(header("content-range", "bytes 0-3/8"))
        .respond_with(ResponseTemplate::new(308))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = upload::upload_chunk(&client, &session, ByteRange::new(0, 3).unwrap(), b"abcd".to_vec())
        .await
        .unwrap();
    assert_eq!(outcome, ChunkOutcome::Continue);
}

#[tokio::test]
async fn test_upload_chunk_rejects_length_mismatch() {
    let (_server, client) = common::setup_graph_mock().await;
    let session =
        oneup_core::domain::transfer::UploadSession::new("http://unused".to_string(), 4, None);
    let err = upload::upload_chunk(&client, &session, ByteRange::new(0, 3).unwrap(), b"ab".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidResponse(_)));
}

// ============================================================================
// Metadata and delete tests
// ============================================================================

#[tokio::test]
async fn test_set_timestamps_patches_file_system_info() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("PATCH"))
        .and(path("/me/drive/items/ITEM1"))
        .and(body_partial_json(serde_json::json!({
            "fileSystemInfo": {
                "createdDateTime": "2024-03-01T08:30:00.000Z",
                "lastModifiedDateTime": "2024-03-01T08:30:00.000Z"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::drive_item("ITEM1", "a", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
    items::set_timestamps(&client, &id("ITEM1"), ts, ts).await.unwrap();
}

#[tokio::test]
async fn test_delete_outcomes() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/GONE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/HERE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/LOCKED"))
        .respond_with(ResponseTemplate::new(423))
        .mount(&server)
        .await;

    assert_eq!(
        items::delete_item(&client, &id("HERE")).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        items::delete_item(&client, &id("GONE")).await.unwrap(),
        DeleteOutcome::AlreadyGone
    );
    assert_eq!(
        items::delete_item(&client, &id("LOCKED")).await.unwrap_err().status(),
        Some(423)
    );
}

// ============================================================================
// Provider tests
// ============================================================================

#[tokio::test]
async fn test_provider_round_trip() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_upload_small(&server, "/Backup/My%20Files/a%20b.txt", "P1", "a b.txt").await;

    let provider = GraphCloudProvider::new(client);
    provider.verify_access().await.unwrap();

    let item = provider
        .upload_small(&remote("/Backup/My Files/a b.txt"), b"x".to_vec())
        .await
        .unwrap();
    assert_eq!(item.id.as_str(), "P1");
}

#[tokio::test]
async fn test_provider_error_keeps_graph_error() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/X1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let provider = GraphCloudProvider::new(client);
    let err = provider.delete_item(&id("X1")).await.unwrap_err();
    let graph = err.downcast_ref::<GraphError>().expect("GraphError in chain");
    assert_eq!(graph.status(), Some(403));
}
