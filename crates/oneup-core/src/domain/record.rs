//! FileRecord domain entity
//!
//! A FileRecord is the persisted belief about what was last uploaded for one
//! relative path. It is created on the first successful upload, refreshed on
//! every re-upload and dropped once the remote copy has been deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RelativePath, RemoteId};
use super::snapshot::LocalEntry;

/// Store record for a single uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Identity key, relative to the sync root
    pub relative_path: RelativePath,
    /// Local modification time at the moment of the last successful upload
    pub modified_at: DateTime<Utc>,
    /// Local size at the moment of the last successful upload
    pub size_bytes: u64,
    /// Item identifier returned by the remote store
    pub remote_id: RemoteId,
}

impl FileRecord {
    /// Creates a new record
    pub fn new(
        relative_path: RelativePath,
        modified_at: DateTime<Utc>,
        size_bytes: u64,
        remote_id: RemoteId,
    ) -> Self {
        Self {
            relative_path,
            modified_at,
            size_bytes,
            remote_id,
        }
    }

    /// Builds the record describing a snapshot entry that was just uploaded
    pub fn from_upload(entry: &LocalEntry, remote_id: RemoteId) -> Self {
        Self::new(
            entry.relative_path.clone(),
            entry.modified_at,
            entry.size_bytes,
            remote_id,
        )
    }

    /// Returns true when both the modification time and the size equal the
    /// entry's, meaning the file does not need to be uploaded again
    pub fn matches(&self, entry: &LocalEntry) -> bool {
        self.modified_at == entry.modified_at && self.size_bytes == entry.size_bytes
    }
}
