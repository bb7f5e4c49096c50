//! Upload operations for Microsoft Graph API (OneDrive)
//!
//! Provides functions for uploading files to OneDrive:
//! - [`upload_small`] - Single-request upload for files under 4MB
//! - [`create_upload_session`] - Creates a resumable upload session
//! - [`upload_chunk`] - Uploads a single window within a session
//!
//! Splitting a file into windows and reading them from disk is the caller's
//! job; these functions only move bytes that are already in memory.
//!
//! ## Microsoft Graph API References
//!
//! - [Upload small files](https://learn.microsoft.com/en-us/graph/api/driveitem-put-content)
//! - [Upload large files](https://learn.microsoft.com/en-us/graph/api/driveitem-createuploadsession)

use chrono::{DateTime, Utc};
use oneup_core::domain::newtypes::RemotePath;
use oneup_core::domain::transfer::{ByteRange, UploadSession};
use oneup_core::ports::{ChunkOutcome, RemoteItem};
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{expect_success, read_json, rejected, GraphClient, RequestAuth};
use crate::items::{item_path, GraphDriveItem};
use crate::GraphError;

/// Response from creating an upload session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSessionResponse {
    /// The URL to use for uploading chunks
    upload_url: String,
    /// When the session expires if no more data arrives
    expiration_date_time: Option<DateTime<Utc>>,
}

// ============================================================================
// upload_small
// ============================================================================

/// Uploads a small file (< 4MB) in a single PUT request
///
/// Uses the simple upload API: `PUT /me/drive/root:{path}:/content`
/// with the file bytes as the request body. An existing item is replaced.
///
/// # Arguments
/// * `client` - The authenticated GraphClient
/// * `path` - Destination path of the file
/// * `data` - File contents
///
/// # Returns
/// The uploaded item's metadata
pub async fn upload_small(
    client: &GraphClient,
    path: &RemotePath,
    data: Vec<u8>,
) -> Result<RemoteItem, GraphError> {
    let url = client.url(&item_path(path, Some("content")));
    debug!(path = %path, bytes = data.len(), "Uploading small file");

    let response = client
        .execute("upload_small", RequestAuth::Bearer, |http| {
            http.put(&url)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data.clone())
        })
        .await?;
    let response = expect_success("upload_small", response).await?;
    let item: GraphDriveItem = read_json("upload_small", response).await?;

    debug!(id = %item.id, name = %item.name, "Small upload completed");
    item.into_remote_item()
}

// ============================================================================
// create_upload_session
// ============================================================================

/// Creates a resumable upload session for large files
///
/// Uses the upload session API: `POST /me/drive/root:{path}:/createUploadSession`
/// with conflict behavior `replace`.
///
/// The returned session URL is pre-authenticated and valid for a limited
/// time (typically 15 minutes of inactivity).
///
/// # Arguments
/// * `client` - The authenticated GraphClient
/// * `path` - Destination path of the file
/// * `total_size` - Size of the complete file
pub async fn create_upload_session(
    client: &GraphClient,
    path: &RemotePath,
    total_size: u64,
) -> Result<UploadSession, GraphError> {
    let url = client.url(&item_path(path, Some("createUploadSession")));
    let body = json!({
        "item": {
            "@microsoft.graph.conflictBehavior": "replace",
        }
    });
    debug!(path = %path, total_size, "Creating upload session");

    let response = client
        .execute("create_upload_session", RequestAuth::Bearer, |http| {
            http.post(&url).json(&body)
        })
        .await?;
    let response = expect_success("create_upload_session", response).await?;
    let session: UploadSessionResponse = read_json("create_upload_session", response).await?;

    Ok(UploadSession::new(
        session.upload_url,
        total_size,
        session.expiration_date_time,
    ))
}

// ============================================================================
// upload_chunk
// ============================================================================

/// Uploads a single window to a resumable upload session
///
/// Sends a PUT request to the session URL with a `Content-Range` header.
/// The session URL is pre-authenticated, so no bearer token is attached.
///
/// # Returns
/// - `Continue` on 202 Accepted (or 308), more windows are expected
/// - `Complete` on 200/201, with the final item metadata
///
/// # Errors
/// Any other status is returned as [`GraphError::Rejected`]
pub async fn upload_chunk(
    client: &GraphClient,
    session: &UploadSession,
    range: ByteRange,
    data: Vec<u8>,
) -> Result<ChunkOutcome, GraphError> {
    if data.len() as u64 != range.len() {
        return Err(GraphError::InvalidResponse(format!(
            "chunk holds {} bytes but range {}-{} needs {}",
            data.len(),
            range.start,
            range.end,
            range.len()
        )));
    }

    let content_range = range.content_range(session.total_size);
    debug!(content_range = %content_range, "Uploading chunk");

    let response = client
        .execute("upload_chunk", RequestAuth::None, |http| {
            http.put(&session.upload_url)
                .header(CONTENT_RANGE, &content_range)
                .body(data.clone())
        })
        .await?;

    match response.status() {
        StatusCode::OK | StatusCode::CREATED => {
            let item: GraphDriveItem = read_json("upload_chunk", response).await?;
            debug!(id = %item.id, "Upload session completed");
            Ok(ChunkOutcome::Complete(item.into_remote_item()?))
        }
        StatusCode::ACCEPTED | StatusCode::PERMANENT_REDIRECT => Ok(ChunkOutcome::Continue),
        _ => Err(rejected("upload_chunk", response).await),
    }
}
