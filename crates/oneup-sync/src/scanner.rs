//! Local scanner
//!
//! Walks the sync root and records every regular file with its size and
//! modification time. Symbolic links are not followed. Anything that cannot
//! be read below the root is logged and skipped so one bad entry never stops
//! the scan.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use oneup_core::domain::{LocalEntry, LocalSnapshot, RelativePath};

use crate::SyncError;

/// Scans `root` into a snapshot
///
/// # Errors
/// Returns `SyncError::RootUnavailable` if the root cannot be read, or
/// `SyncError::RootNotDirectory` if it is not a directory
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub async fn scan(root: &Path) -> Result<LocalSnapshot, SyncError> {
    let metadata = tokio::fs::metadata(root)
        .await
        .map_err(|source| SyncError::RootUnavailable {
            path: root.to_path_buf(),
            source,
        })?;
    if !metadata.is_dir() {
        return Err(SyncError::RootNotDirectory(root.to_path_buf()));
    }

    // The root itself must be listable; deeper failures are only logged
    let entries = tokio::fs::read_dir(root)
        .await
        .map_err(|source| SyncError::RootUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

    let mut snapshot = LocalSnapshot::new();
    walk_entries(root, entries, &mut snapshot).await;

    info!(
        files = snapshot.len(),
        bytes = snapshot.total_bytes(),
        "Local scan complete"
    );
    Ok(snapshot)
}

fn walk_directory<'a>(
    root: &'a Path,
    dir: &'a Path,
    snapshot: &'a mut LocalSnapshot,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        match tokio::fs::read_dir(dir).await {
            Ok(entries) => walk_entries(root, entries, snapshot).await,
            Err(err) => warn!(path = %dir.display(), %err, "Skipping unreadable directory"),
        }
    })
}

/// Consecutive listing errors after which a directory is abandoned
const MAX_LISTING_ERRORS: u32 = 8;

/// Counts back-to-back failures while reading one directory's entries
#[derive(Debug, Default)]
struct ListingErrors {
    consecutive: u32,
}

impl ListingErrors {
    /// Records a failure; `false` once the directory should be given up
    fn failed(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive < MAX_LISTING_ERRORS
    }

    fn succeeded(&mut self) {
        self.consecutive = 0;
    }
}

async fn walk_entries(root: &Path, mut entries: tokio::fs::ReadDir, snapshot: &mut LocalSnapshot) {
    let mut errors = ListingErrors::default();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => {
                errors.succeeded();
                entry
            }
            Ok(None) => break,
            Err(err) => {
                if errors.failed() {
                    warn!(%err, "Skipping unreadable directory entry");
                    continue;
                }
                warn!(%err, attempts = MAX_LISTING_ERRORS, "Giving up on directory listing");
                break;
            }
        };
        let path = entry.path();

        // DirEntry::file_type does not follow symlinks
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(err) => {
                warn!(path = %path.display(), %err, "Skipping entry");
                continue;
            }
        };

        if file_type.is_symlink() {
            debug!(path = %path.display(), "Skipping symbolic link");
        } else if file_type.is_dir() {
            walk_directory(root, &path, snapshot).await;
        } else if file_type.is_file() {
            match stat_file(root, &path).await {
                Ok(local) => snapshot.insert(local),
                Err(err) => warn!(path = %path.display(), error = %err, "Skipping file"),
            }
        }
    }
}

async fn stat_file(root: &Path, path: &Path) -> Result<LocalEntry, SyncError> {
    let metadata = tokio::fs::symlink_metadata(path).await?;
    let modified: DateTime<Utc> = metadata.modified()?.into();
    let relative_path = RelativePath::from_local(root, path)?;

    Ok(LocalEntry {
        relative_path,
        absolute_path: path.to_path_buf(),
        modified_at: modified,
        size_bytes: metadata.len(),
    })
}
