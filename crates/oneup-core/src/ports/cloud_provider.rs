//! Cloud provider port (driven/secondary port)
//!
//! This module defines the drive operations the sync engine needs from the
//! remote object store. The implementation targets Microsoft OneDrive via
//! the Microsoft Graph API.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - Outcomes the engine must branch on (folder missing, chunk accepted,
//!   item already deleted) are modelled as values, not errors.
//! - Implementations retry transient failures internally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{RemoteId, RemotePath};
use crate::domain::transfer::{ByteRange, UploadSession};

// ============================================================================
// Operation results
// ============================================================================

/// Metadata of a remote item returned by an upload or folder creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Provider-specific item identifier
    pub id: RemoteId,
    /// Item name
    pub name: String,
    /// Size in bytes as reported by the provider (None for folders)
    pub size: Option<u64>,
}

/// Result of sending one window of a chunked upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The window was accepted and the session expects more data
    Continue,
    /// The final window was accepted and the item now exists
    Complete(RemoteItem),
}

/// Result of deleting a remote item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The item was deleted by this request
    Deleted,
    /// The item did not exist anymore
    AlreadyGone,
}

// ============================================================================
// ICloudProvider trait
// ============================================================================

/// Port trait for cloud storage provider operations
///
/// All paths are absolute remote paths; the caller is responsible for
/// mapping local relative paths under the configured remote folder.
#[async_trait::async_trait]
pub trait ICloudProvider: Send + Sync {
    /// Checks that the credential works and the drive is reachable
    ///
    /// Called once before a run; a failure aborts the run before any
    /// reconciliation happens.
    async fn verify_access(&self) -> anyhow::Result<()>;

    /// Returns whether an item exists at `path`
    ///
    /// # Returns
    /// `Ok(false)` when the provider answers "not found"
    async fn folder_exists(&self, path: &RemotePath) -> anyhow::Result<bool>;

    /// Creates the folder at `path`, replacing any item with the same name
    ///
    /// The parent folder must already exist.
    async fn create_folder(&self, path: &RemotePath) -> anyhow::Result<RemoteItem>;

    /// Uploads a small file in a single request
    ///
    /// # Arguments
    /// * `path` - Destination path of the file
    /// * `data` - The complete file contents
    ///
    /// # Returns
    /// Metadata of the uploaded file
    async fn upload_small(&self, path: &RemotePath, data: Vec<u8>) -> anyhow::Result<RemoteItem>;

    /// Opens a resumable upload session for a file of `total_size` bytes
    ///
    /// The session replaces any existing item at `path` on completion.
    async fn create_upload_session(
        &self,
        path: &RemotePath,
        total_size: u64,
    ) -> anyhow::Result<UploadSession>;

    /// Sends one window of a chunked upload
    ///
    /// # Arguments
    /// * `session` - Session returned by `create_upload_session`
    /// * `range` - Byte window being sent
    /// * `data` - Exactly `range.len()` bytes
    ///
    /// # Returns
    /// `Continue` or `Complete`; any other provider answer is an error
    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        data: Vec<u8>,
    ) -> anyhow::Result<ChunkOutcome>;

    /// Sets the created and last-modified timestamps of an item
    async fn set_timestamps(
        &self,
        remote_id: &RemoteId,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Deletes an item from the cloud storage
    ///
    /// # Returns
    /// `AlreadyGone` when the provider answers "not found"
    async fn delete_item(&self, remote_id: &RemoteId) -> anyhow::Result<DeleteOutcome>;
}
