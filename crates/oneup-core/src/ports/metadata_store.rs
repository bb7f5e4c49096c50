//! Metadata store port (driven/secondary port)
//!
//! Persisted mapping from relative path to what was last uploaded for it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and don't need domain-level classification.
//! - Every method is atomic on its own. Callers that combine a read with a
//!   write (the sync ledger) provide their own serialization.

use std::collections::HashMap;

use crate::domain::{FileRecord, RelativePath};

/// Port trait for the persisted file records
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Loads every record keyed by relative path
    async fn load_all(&self) -> anyhow::Result<HashMap<RelativePath, FileRecord>>;

    /// Gets the record for one path
    async fn get(&self, path: &RelativePath) -> anyhow::Result<Option<FileRecord>>;

    /// Inserts a record or replaces the one with the same path
    async fn upsert(&self, record: &FileRecord) -> anyhow::Result<()>;

    /// Removes the record for `path`
    ///
    /// # Returns
    /// Whether a record was removed
    async fn delete(&self, path: &RelativePath) -> anyhow::Result<bool>;

    /// Number of records and the sum of their sizes
    async fn totals(&self) -> anyhow::Result<(u64, u64)>;
}
