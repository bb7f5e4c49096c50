//! Local snapshot types
//!
//! A [`LocalSnapshot`] is the state of every regular file under the sync root
//! as observed by one scan. It is rebuilt on every run and never persisted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RelativePath;

/// One regular file observed during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntry {
    /// Path relative to the sync root
    pub relative_path: RelativePath,
    /// Absolute path used to read the content
    pub absolute_path: PathBuf,
    /// Modification time reported by the filesystem
    pub modified_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Ordered map of relative path to entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSnapshot {
    entries: BTreeMap<RelativePath, LocalEntry>,
}

impl LocalSnapshot {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, entry: LocalEntry) {
        self.entries.insert(entry.relative_path.clone(), entry);
    }

    pub fn get(&self, path: &RelativePath) -> Option<&LocalEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = &LocalEntry> {
        self.entries.values()
    }

    /// Sum of all entry sizes
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

impl FromIterator<LocalEntry> for LocalSnapshot {
    fn from_iter<I: IntoIterator<Item = LocalEntry>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for entry in iter {
            snapshot.insert(entry);
        }
        snapshot
    }
}

impl IntoIterator for LocalSnapshot {
    type Item = LocalEntry;
    type IntoIter = std::collections::btree_map::IntoValues<RelativePath, LocalEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
