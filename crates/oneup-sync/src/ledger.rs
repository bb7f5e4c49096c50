//! Sync ledger
//!
//! The single serialization point for store access during a run. Workers
//! ask the ledger whether a path needs uploading and report successful
//! uploads back to it; the deletion pass drains what no snapshot entry
//! claimed. The lock is held for one read-check-then-write against the
//! store and is never held across a network call.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use oneup_core::domain::{FileRecord, LocalEntry, PathState, RelativePath, RemoteId};
use oneup_core::ports::IMetadataStore;

struct LedgerState {
    /// Records loaded at the start of the run and not yet claimed
    remaining: HashMap<RelativePath, FileRecord>,
}

/// Lock-guarded owner of all store mutation for one run
pub struct SyncLedger {
    store: Arc<dyn IMetadataStore>,
    state: Mutex<LedgerState>,
}

impl SyncLedger {
    /// Creates a ledger over the records loaded at the start of the run
    pub fn new(store: Arc<dyn IMetadataStore>, records: HashMap<RelativePath, FileRecord>) -> Self {
        Self {
            store,
            state: Mutex::new(LedgerState { remaining: records }),
        }
    }

    /// Claims the record for a snapshot entry and classifies the entry
    ///
    /// A claimed record is no longer a deletion candidate, whatever
    /// happens to the upload.
    pub async fn claim(&self, entry: &LocalEntry) -> PathState {
        let mut state = self.state.lock().await;
        let record = state.remaining.remove(&entry.relative_path);
        PathState::classify(entry, record.as_ref())
    }

    /// Records a successful upload, inserting or replacing the row
    pub async fn commit_upload(&self, entry: &LocalEntry, remote_id: RemoteId) -> Result<()> {
        let record = FileRecord::from_upload(entry, remote_id);
        let _state = self.state.lock().await;
        self.store
            .upsert(&record)
            .await
            .with_context(|| format!("Failed to save record for {}", entry.relative_path))
    }

    /// Drains every unclaimed record, sorted by path
    pub async fn take_remaining(&self) -> Vec<FileRecord> {
        let mut state = self.state.lock().await;
        let mut records: Vec<FileRecord> = state.remaining.drain().map(|(_, r)| r).collect();
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        records
    }

    /// Removes the row for a path whose remote item is gone
    ///
    /// # Returns
    /// Whether a row was removed
    pub async fn forget(&self, path: &RelativePath) -> Result<bool> {
        let _state = self.state.lock().await;
        self.store
            .delete(path)
            .await
            .with_context(|| format!("Failed to remove record for {path}"))
    }
}
