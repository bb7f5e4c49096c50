//! Reconciliation plan
//!
//! Splits a local snapshot and the stored records into the paths that need
//! uploading, the paths that are already in sync and the records whose file
//! has disappeared locally.
//!
//! ```text
//!   snapshot entry   store record          state
//!   --------------   ------------------    ---------
//!   present          absent                New
//!   present          same mtime + size     Unchanged
//!   present          different             Changed
//!   absent           present               Removed
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::errors::DomainError;
use super::newtypes::{RelativePath, RemotePath};
use super::record::FileRecord;
use super::snapshot::{LocalEntry, LocalSnapshot};

/// Reconciliation state of one path for the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    /// No store record, upload and insert
    New,
    /// Record matches the snapshot, nothing to do
    Unchanged,
    /// Record differs in mtime or size, upload and update
    Changed,
    /// Record without snapshot entry, delete remotely and drop the record
    Removed,
}

impl PathState {
    /// Classifies a snapshot entry against its prior record
    ///
    /// Only `New`, `Unchanged` or `Changed` come out of here: a path that
    /// is on disk cannot be removed. See [`PathState::of_record`].
    pub fn classify(entry: &LocalEntry, record: Option<&FileRecord>) -> Self {
        match record {
            None => Self::New,
            Some(record) if record.matches(entry) => Self::Unchanged,
            Some(_) => Self::Changed,
        }
    }

    /// Classifies a stored record against the snapshot entry for its path
    ///
    /// `Removed` when the file is gone locally, otherwise the same answer
    /// as [`PathState::classify`].
    pub fn of_record(record: &FileRecord, entry: Option<&LocalEntry>) -> Self {
        match entry {
            None => Self::Removed,
            Some(entry) => Self::classify(entry, Some(record)),
        }
    }

    /// Whether the path needs an upload
    pub fn needs_upload(&self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }
}

/// Three-way split of snapshot against store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub new: Vec<RelativePath>,
    pub changed: Vec<RelativePath>,
    pub unchanged: Vec<RelativePath>,
    pub removed: Vec<FileRecord>,
    /// Total size of the new and changed files
    pub upload_bytes: u64,
}

impl SyncPlan {
    /// Computes the plan. Output vectors are sorted by path.
    pub fn compute(snapshot: &LocalSnapshot, records: &HashMap<RelativePath, FileRecord>) -> Self {
        let mut plan = Self::default();

        for entry in snapshot.iter() {
            let state = PathState::classify(entry, records.get(&entry.relative_path));
            if state.needs_upload() {
                plan.upload_bytes += entry.size_bytes;
            }
            match state {
                PathState::New => plan.new.push(entry.relative_path.clone()),
                PathState::Changed => plan.changed.push(entry.relative_path.clone()),
                PathState::Unchanged => plan.unchanged.push(entry.relative_path.clone()),
                // not produced for a snapshot entry, see below
                PathState::Removed => {}
            }
        }

        plan.removed = records
            .values()
            .filter(|record| {
                PathState::of_record(record, snapshot.get(&record.relative_path))
                    == PathState::Removed
            })
            .cloned()
            .collect();
        plan.removed
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        plan
    }

    /// Paths that will be uploaded, new first then changed
    pub fn uploads(&self) -> impl Iterator<Item = &RelativePath> {
        self.new.iter().chain(self.changed.iter())
    }

    /// Remote folders that must exist before the uploads start
    ///
    /// Contains the parent of every file to upload plus all of that parent's
    /// ancestors, down from `prefix` itself. The drive root is never included.
    ///
    /// # Errors
    /// Returns error if a path cannot be mapped under `prefix`
    pub fn required_folders(&self, prefix: &RemotePath) -> Result<BTreeSet<RemotePath>, DomainError> {
        let mut folders = BTreeSet::new();
        for relative in self.uploads() {
            let remote = RemotePath::for_file(prefix, relative)?;
            folders.extend(remote.ancestors());
        }
        Ok(folders)
    }

    /// Whether the run would change nothing
    pub fn is_noop(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}
