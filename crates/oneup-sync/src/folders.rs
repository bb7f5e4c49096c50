//! Remote folder cache builder
//!
//! Makes sure every folder an upload needs exists before the workers start.
//! Folders are handled shallow to deep so a parent is always confirmed
//! before any of its children is created.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use oneup_core::domain::RemotePath;
use oneup_core::ports::ICloudProvider;

/// Outcome of one folder pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderReport {
    /// Folders created by this pass, in creation order
    pub created: Vec<RemotePath>,
    /// Folders that already existed
    pub existing: Vec<RemotePath>,
    /// Folders that could not be confirmed, with the reason
    pub failed: Vec<(RemotePath, String)>,
}

/// Creates missing remote folders and remembers the ones it has confirmed
pub struct FolderCacheBuilder {
    provider: Arc<dyn ICloudProvider>,
    known: HashSet<RemotePath>,
}

impl FolderCacheBuilder {
    pub fn new(provider: Arc<dyn ICloudProvider>) -> Self {
        Self {
            provider,
            known: HashSet::new(),
        }
    }

    /// Whether `path` was confirmed by an earlier call
    pub fn is_known(&self, path: &RemotePath) -> bool {
        path.is_root() || self.known.contains(path)
    }

    /// Ensures every folder in `folders`, and each of their ancestors, exists
    ///
    /// Folders are processed by ascending depth, ties broken by path. The
    /// drive root is never looked up. A failure is recorded in the report and
    /// the remaining folders are still attempted.
    #[tracing::instrument(skip_all)]
    pub async fn ensure_folders<I>(&mut self, folders: I) -> FolderReport
    where
        I: IntoIterator<Item = RemotePath>,
    {
        let mut report = FolderReport::default();

        for folder in ordered_with_ancestors(folders) {
            if self.is_known(&folder) {
                continue;
            }

            match self.ensure_one(&folder).await {
                Ok(true) => {
                    info!(path = %folder, "Created remote folder");
                    report.created.push(folder.clone());
                    self.known.insert(folder);
                }
                Ok(false) => {
                    debug!(path = %folder, "Remote folder exists");
                    report.existing.push(folder.clone());
                    self.known.insert(folder);
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(path = %folder, error = %reason, "Failed to ensure remote folder");
                    report.failed.push((folder, reason));
                }
            }
        }

        report
    }

    /// Looks `folder` up and creates it when missing
    ///
    /// # Returns
    /// `true` when the folder was created
    async fn ensure_one(&self, folder: &RemotePath) -> anyhow::Result<bool> {
        if self.provider.folder_exists(folder).await? {
            return Ok(false);
        }
        self.provider.create_folder(folder).await?;
        Ok(true)
    }
}

/// Expands `folders` with their ancestors and sorts by (depth, path)
fn ordered_with_ancestors<I>(folders: I) -> Vec<RemotePath>
where
    I: IntoIterator<Item = RemotePath>,
{
    let mut all = BTreeSet::new();
    for folder in folders {
        if folder.is_root() {
            continue;
        }
        all.extend(folder.ancestors());
        all.insert(folder);
    }

    let mut ordered: Vec<RemotePath> = all.into_iter().collect();
    ordered.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.cmp(b)));
    ordered
}
