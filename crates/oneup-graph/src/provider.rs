//! GraphCloudProvider - ICloudProvider implementation for Microsoft Graph API
//!
//! Wraps the [`GraphClient`] and delegates to the items and upload modules
//! to fulfil the [`ICloudProvider`] port contract.
//!
//! ## Design Notes
//!
//! - Every request goes through the client's retry policy; this layer only
//!   maps results and adds error context.
//! - Typed [`GraphError`](crate::GraphError)s are converted to `anyhow::Error`
//!   at the port boundary and can be recovered with `downcast_ref`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use oneup_core::domain::newtypes::{RemoteId, RemotePath};
use oneup_core::domain::transfer::{ByteRange, UploadSession};
use oneup_core::ports::{ChunkOutcome, DeleteOutcome, ICloudProvider, RemoteItem};

use crate::client::GraphClient;
use crate::items;
use crate::upload;

/// Microsoft Graph API implementation of [`ICloudProvider`]
pub struct GraphCloudProvider {
    client: GraphClient,
}

impl GraphCloudProvider {
    /// Creates a new GraphCloudProvider wrapping the given GraphClient
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ICloudProvider for GraphCloudProvider {
    async fn verify_access(&self) -> Result<()> {
        items::verify_access(&self.client)
            .await
            .context("Drive root is not reachable")
    }

    async fn folder_exists(&self, path: &RemotePath) -> Result<bool> {
        items::item_exists(&self.client, path)
            .await
            .with_context(|| format!("Failed to check remote folder {path}"))
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<RemoteItem> {
        items::create_folder(&self.client, path)
            .await
            .with_context(|| format!("Failed to create remote folder {path}"))
    }

    async fn upload_small(&self, path: &RemotePath, data: Vec<u8>) -> Result<RemoteItem> {
        upload::upload_small(&self.client, path, data)
            .await
            .with_context(|| format!("Failed to upload {path}"))
    }

    async fn create_upload_session(
        &self,
        path: &RemotePath,
        total_size: u64,
    ) -> Result<UploadSession> {
        upload::create_upload_session(&self.client, path, total_size)
            .await
            .with_context(|| format!("Failed to create upload session for {path}"))
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        data: Vec<u8>,
    ) -> Result<ChunkOutcome> {
        upload::upload_chunk(&self.client, session, range, data)
            .await
            .with_context(|| {
                format!(
                    "Failed to upload bytes {}-{}/{}",
                    range.start, range.end, session.total_size
                )
            })
    }

    async fn set_timestamps(
        &self,
        remote_id: &RemoteId,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Result<()> {
        items::set_timestamps(&self.client, remote_id, created, modified)
            .await
            .with_context(|| format!("Failed to set timestamps of item {remote_id}"))
    }

    async fn delete_item(&self, remote_id: &RemoteId) -> Result<DeleteOutcome> {
        items::delete_item(&self.client, remote_id)
            .await
            .with_context(|| format!("Failed to delete item {remote_id}"))
    }
}
