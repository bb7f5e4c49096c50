//! Upload dispatcher
//!
//! Routes each file to a simple single-request upload or a chunked upload
//! session depending on its size, then optionally stamps the remote item
//! with the local modification time.
//!
//! ```text
//!   size <  small_file_threshold   -> PUT :/content
//!   size >= small_file_threshold   -> createUploadSession + PUT per window
//!   size >  skip_metadata_threshold -> PATCH fileSystemInfo (best effort)
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use oneup_core::config::TransferConfig;
use oneup_core::domain::{chunk_ranges, LocalEntry, RemoteId, RemotePath};
use oneup_core::ports::{ChunkOutcome, ICloudProvider};

use crate::SyncError;

/// Byte thresholds steering the upload path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Files strictly smaller than this go through a simple upload
    pub small_file_threshold: u64,
    /// Window size of a chunked upload
    pub chunk_size: u64,
    /// Files strictly larger than this get their timestamps patched
    pub skip_metadata_threshold: u64,
}

impl UploadLimits {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            small_file_threshold: config.small_file_threshold_bytes(),
            chunk_size: config.chunk_size_bytes(),
            skip_metadata_threshold: config.skip_metadata_threshold_bytes(),
        }
    }

    /// Upload path for a file of `size` bytes
    pub fn route(&self, size: u64) -> UploadRoute {
        if size < self.small_file_threshold {
            UploadRoute::Simple
        } else {
            UploadRoute::Chunked
        }
    }

    /// Whether a file of `size` bytes gets its timestamps patched
    pub fn patches_metadata(&self, size: u64) -> bool {
        size > self.skip_metadata_threshold
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&TransferConfig::default())
    }
}

/// Which upload protocol a file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRoute {
    Simple,
    Chunked,
}

/// Performs uploads against a cloud provider
#[derive(Clone)]
pub struct UploadDispatcher {
    provider: Arc<dyn ICloudProvider>,
    limits: UploadLimits,
}

impl UploadDispatcher {
    pub fn new(provider: Arc<dyn ICloudProvider>, limits: UploadLimits) -> Self {
        Self { provider, limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Uploads one file to `remote_path`
    ///
    /// # Arguments
    /// * `entry` - Snapshot entry describing the local file
    /// * `remote_path` - Destination path in the drive
    ///
    /// # Returns
    /// The identifier of the remote item
    ///
    /// # Errors
    /// Returns error if the file cannot be read, changed size since the scan,
    /// or the provider refused a request
    pub async fn upload(&self, entry: &LocalEntry, remote_path: &RemotePath) -> Result<RemoteId> {
        let route = self.limits.route(entry.size_bytes);
        let remote_id = match route {
            UploadRoute::Simple => self.upload_simple(entry, remote_path).await?,
            UploadRoute::Chunked => self.upload_chunked(entry, remote_path).await?,
        };

        if self.limits.patches_metadata(entry.size_bytes) {
            if let Err(err) = self
                .provider
                .set_timestamps(&remote_id, entry.modified_at, entry.modified_at)
                .await
            {
                warn!(path = %remote_path, error = %format!("{err:#}"), "Failed to set remote timestamps");
            }
        }

        info!(
            path = %entry.relative_path,
            remote_id = %remote_id,
            size = entry.size_bytes,
            route = ?route,
            "Uploaded file"
        );
        Ok(remote_id)
    }

    async fn upload_simple(&self, entry: &LocalEntry, remote_path: &RemotePath) -> Result<RemoteId> {
        let data = tokio::fs::read(&entry.absolute_path)
            .await
            .with_context(|| format!("Failed to read {}", entry.absolute_path.display()))?;
        if data.len() as u64 != entry.size_bytes {
            return Err(SyncError::FileChanged(entry.absolute_path.clone()).into());
        }

        let item = self
            .provider
            .upload_small(remote_path, data)
            .await
            .with_context(|| format!("Simple upload of {remote_path} failed"))?;
        Ok(item.id)
    }

    async fn upload_chunked(&self, entry: &LocalEntry, remote_path: &RemotePath) -> Result<RemoteId> {
        let total = entry.size_bytes;
        let ranges = chunk_ranges(total, self.limits.chunk_size).map_err(SyncError::from)?;

        let mut file = tokio::fs::File::open(&entry.absolute_path)
            .await
            .with_context(|| format!("Failed to open {}", entry.absolute_path.display()))?;
        if file.metadata().await?.len() != total {
            return Err(SyncError::FileChanged(entry.absolute_path.clone()).into());
        }

        let mut session = self
            .provider
            .create_upload_session(remote_path, total)
            .await
            .with_context(|| format!("Failed to open upload session for {remote_path}"))?;
        debug!(path = %remote_path, windows = ranges.len(), "Upload session opened");

        for range in ranges {
            let mut buffer = vec![0u8; range.len() as usize];
            file.read_exact(&mut buffer).await.map_err(|err| {
                if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    anyhow::Error::from(SyncError::FileChanged(entry.absolute_path.clone()))
                } else {
                    anyhow::Error::from(err)
                }
            })?;

            let outcome = self
                .provider
                .upload_chunk(&session, range, buffer)
                .await
                .with_context(|| {
                    format!("Chunk {} of {remote_path} failed", range.content_range(total))
                })?;

            match outcome {
                ChunkOutcome::Continue => {
                    session.confirm(&range);
                    debug!(
                        path = %remote_path,
                        confirmed = session.bytes_confirmed,
                        remaining = session.remaining(),
                        "Chunk accepted"
                    );
                }
                ChunkOutcome::Complete(item) => {
                    session.confirm(&range);
                    debug!(path = %remote_path, "Upload session complete");
                    return Ok(item.id);
                }
            }
        }

        Err(SyncError::IncompleteUpload(remote_path.clone()).into())
    }
}
