//! Drive item operations for Microsoft Graph API (OneDrive)
//!
//! Addressing helpers for the item-by-path pattern plus the non-upload
//! operations the sync engine needs:
//! - [`verify_access`] - `GET /me/drive/root`
//! - [`item_exists`] - `GET /me/drive/root:/{path}`
//! - [`create_folder`] - `POST .../children` with conflict behavior `replace`
//! - [`set_timestamps`] - `PATCH /me/drive/items/{id}` with `fileSystemInfo`
//! - [`delete_item`] - `DELETE /me/drive/items/{id}`

use chrono::{DateTime, SecondsFormat, Utc};
use oneup_core::domain::newtypes::{RemoteId, RemotePath};
use oneup_core::ports::{DeleteOutcome, RemoteItem};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::client::{expect_success, read_json, rejected, GraphClient, RequestAuth};
use crate::GraphError;

// ============================================================================
// Graph API DriveItem response type
// ============================================================================

/// DriveItem returned by uploads and folder creation
///
/// Only the fields the engine needs are mapped; unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphDriveItem {
    /// OneDrive item ID
    pub(crate) id: String,
    /// Item name
    pub(crate) name: String,
    /// Size in bytes
    pub(crate) size: Option<u64>,
    /// Present if the item is a folder
    pub(crate) folder: Option<serde_json::Value>,
}

impl GraphDriveItem {
    /// Converts into the port-level [`RemoteItem`]
    pub(crate) fn into_remote_item(self) -> Result<RemoteItem, GraphError> {
        let id = RemoteId::new(self.id)
            .map_err(|e| GraphError::InvalidResponse(format!("item id: {e}")))?;
        Ok(RemoteItem {
            id,
            name: self.name,
            size: if self.folder.is_some() { None } else { self.size },
        })
    }
}

// ============================================================================
// API path construction helpers
// ============================================================================

/// Percent-encodes each segment of a remote path
fn encoded_segments(path: &RemotePath) -> String {
    path.segments()
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the Graph API path addressing an item by its drive path
///
/// - Root: `/me/drive/root` or `/me/drive/root/{suffix}`
/// - Other: `/me/drive/root:/{path}` or `/me/drive/root:/{path}:/{suffix}`
///
/// # Arguments
/// * `path` - Remote path of the item
/// * `suffix` - Optional operation suffix (e.g., "content" or "children")
pub fn item_path(path: &RemotePath, suffix: Option<&str>) -> String {
    match (path.is_root(), suffix) {
        (true, None) => "/me/drive/root".to_string(),
        (true, Some(suffix)) => format!("/me/drive/root/{suffix}"),
        (false, None) => format!("/me/drive/root:/{}", encoded_segments(path)),
        (false, Some(suffix)) => {
            format!("/me/drive/root:/{}:/{suffix}", encoded_segments(path))
        }
    }
}

/// Builds the Graph API path addressing an item by its ID
pub fn item_id_path(id: &RemoteId) -> String {
    format!("/me/drive/items/{}", urlencoding::encode(id.as_str()))
}

// ============================================================================
// Operations
// ============================================================================

/// Checks that the token is accepted and the drive root is reachable
pub async fn verify_access(client: &GraphClient) -> Result<(), GraphError> {
    let url = client.url(&item_path(&RemotePath::root(), None));
    let response = client
        .execute("verify_access", RequestAuth::Bearer, |http| http.get(&url))
        .await?;
    expect_success("verify_access", response).await?;
    debug!("Drive root reachable");
    Ok(())
}

/// Returns whether an item exists at `path`
///
/// # Returns
/// `Ok(true)` on 200, `Ok(false)` on 404, an error otherwise
pub async fn item_exists(client: &GraphClient, path: &RemotePath) -> Result<bool, GraphError> {
    let url = client.url(&item_path(path, None));
    let response = client
        .execute("item_exists", RequestAuth::Bearer, |http| http.get(&url))
        .await?;

    match response.status() {
        status if status.is_success() => Ok(true),
        StatusCode::NOT_FOUND => Ok(false),
        _ => Err(rejected("item_exists", response).await),
    }
}

/// Creates a folder, replacing any item of the same name
///
/// Uses `POST /me/drive/root:/{parent}:/children` (or
/// `/me/drive/root/children` directly under the root) with conflict
/// behavior `replace`.
///
/// # Errors
/// Returns an error for the drive root or when the request fails
pub async fn create_folder(client: &GraphClient, path: &RemotePath) -> Result<RemoteItem, GraphError> {
    let (parent, name) = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => (parent, name.to_string()),
        _ => {
            return Err(GraphError::InvalidResponse(
                "cannot create the drive root".to_string(),
            ))
        }
    };

    let url = client.url(&item_path(&parent, Some("children")));
    let body = json!({
        "name": name,
        "folder": {},
        "@microsoft.graph.conflictBehavior": "replace",
    });

    let response = client
        .execute("create_folder", RequestAuth::Bearer, |http| {
            http.post(&url).json(&body)
        })
        .await?;
    let response = expect_success("create_folder", response).await?;
    let item: GraphDriveItem = read_json("create_folder", response).await?;

    info!(path = %path, id = %item.id, "Created remote folder");
    item.into_remote_item()
}

/// Sets `fileSystemInfo.createdDateTime` and `lastModifiedDateTime`
pub async fn set_timestamps(
    client: &GraphClient,
    id: &RemoteId,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
) -> Result<(), GraphError> {
    let url = client.url(&item_id_path(id));
    let body = json!({
        "fileSystemInfo": {
            "createdDateTime": created.to_rfc3339_opts(SecondsFormat::Millis, true),
            "lastModifiedDateTime": modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    });

    let response = client
        .execute("set_timestamps", RequestAuth::Bearer, |http| {
            http.patch(&url).json(&body)
        })
        .await?;
    expect_success("set_timestamps", response).await?;

    debug!(id = %id, "Patched remote timestamps");
    Ok(())
}

/// Deletes an item by ID
///
/// # Returns
/// `Deleted` on 2xx, `AlreadyGone` on 404, an error otherwise
pub async fn delete_item(client: &GraphClient, id: &RemoteId) -> Result<DeleteOutcome, GraphError> {
    let url = client.url(&item_id_path(id));
    let response = client
        .execute("delete_item", RequestAuth::Bearer, |http| http.delete(&url))
        .await?;

    match response.status() {
        status if status.is_success() => Ok(DeleteOutcome::Deleted),
        StatusCode::NOT_FOUND => Ok(DeleteOutcome::AlreadyGone),
        _ => Err(rejected("delete_item", response).await),
    }
}
