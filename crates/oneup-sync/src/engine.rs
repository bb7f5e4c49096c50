//! One-way synchronization engine
//!
//! The [`SyncEngine`] mirrors a local directory tree into a folder of the
//! remote drive.
//!
//! ## Sync Flow
//!
//! 1. **Precondition**: verify the drive is reachable with the current token
//! 2. **Scan**: walk the sync root into a snapshot
//! 3. **Plan**: load the store and split snapshot against records
//! 4. **Folders**: create every remote folder the uploads need, shallow first
//! 5. **Uploads**: one task per snapshot path on a bounded worker pool
//! 6. **Deletions**: sequentially remove remote items whose file is gone
//!
//! Phases run strictly one after the other. Only the precondition, scan and
//! store load can fail the run; everything later is isolated per item and
//! reported in [`SyncResult`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use oneup_core::config::Config;
use oneup_core::domain::{
    DomainError, FileRecord, LocalEntry, LocalSnapshot, RelativePath, RemotePath, SyncPlan,
};
use oneup_core::ports::{DeleteOutcome, ICloudProvider, IMetadataStore};

use crate::folders::FolderCacheBuilder;
use crate::ledger::SyncLedger;
use crate::scanner;
use crate::uploader::{UploadDispatcher, UploadLimits};

// ============================================================================
// SyncResult
// ============================================================================

/// Summary of a completed synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Number of files uploaded (new or changed)
    pub files_uploaded: u32,
    /// Number of files whose record already matched
    pub files_unchanged: u32,
    /// Number of remote items removed because the local file is gone
    pub files_deleted: u32,
    /// Number of uploads or deletions that failed and are left for the next run
    pub files_failed: u32,
    /// Number of remote folders created
    pub folders_created: u32,
    /// Bytes sent by successful uploads
    pub bytes_uploaded: u64,
    /// Errors encountered during the run (non-fatal)
    pub errors: Vec<String>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl SyncResult {
    /// Whether every item was handled without error
    pub fn is_clean(&self) -> bool {
        self.files_failed == 0 && self.errors.is_empty()
    }
}

/// Outcome of one worker task
#[derive(Debug)]
enum FileOutcome {
    Unchanged,
    Uploaded { bytes: u64 },
    Failed { path: RelativePath, error: String },
}

// ============================================================================
// SyncOptions
// ============================================================================

/// Run parameters for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Local directory to mirror
    pub root: PathBuf,
    /// Remote folder receiving the tree
    pub remote_prefix: RemotePath,
    /// Upload routing thresholds
    pub limits: UploadLimits,
    /// Maximum number of concurrent uploads
    pub concurrency: usize,
}

impl SyncOptions {
    /// Builds options from the application configuration
    ///
    /// # Errors
    /// Returns error if `sync.remote_folder` is not a valid remote path
    pub fn from_config(config: &Config) -> Result<Self, DomainError> {
        Ok(Self {
            root: config.sync.root.clone(),
            remote_prefix: config.sync.remote_prefix()?,
            limits: UploadLimits::from_config(&config.transfer),
            concurrency: config.transfer.concurrency,
        })
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way synchronization engine
///
/// ## Dependencies
///
/// - `provider`: Remote drive operations (lookup, create, upload, delete)
/// - `store`: Persisted records of previous uploads
pub struct SyncEngine {
    provider: Arc<dyn ICloudProvider>,
    store: Arc<dyn IMetadataStore>,
    options: SyncOptions,
}

impl SyncEngine {
    /// Creates a new `SyncEngine`
    ///
    /// # Arguments
    /// * `provider` - Cloud storage operations (ICloudProvider)
    /// * `store` - Record persistence (IMetadataStore)
    /// * `options` - Root, remote folder, limits and concurrency
    pub fn new(
        provider: Arc<dyn ICloudProvider>,
        store: Arc<dyn IMetadataStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            provider,
            store,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Computes what a run would do without contacting the remote drive
    ///
    /// # Errors
    /// Returns error if the sync root cannot be scanned or the store
    /// cannot be read
    #[tracing::instrument(skip(self), fields(root = %self.options.root.display()))]
    pub async fn plan(&self) -> Result<SyncPlan> {
        let (snapshot, records) = self.scan_and_load().await?;
        Ok(SyncPlan::compute(&snapshot, &records))
    }

    /// Runs one full synchronization
    ///
    /// # Returns
    /// A summary of the run. Per-file failures are counted in the result;
    /// only a failed precondition (unreachable drive, unreadable root or
    /// store) is returned as an error, before anything has been changed.
    #[tracing::instrument(skip(self), fields(root = %self.options.root.display(), remote = %self.options.remote_prefix))]
    pub async fn sync(&self) -> Result<SyncResult> {
        let start = Instant::now();
        let mut result = SyncResult::default();

        self.provider
            .verify_access()
            .await
            .context("Remote drive is not reachable")?;

        let (snapshot, records) = self.scan_and_load().await?;
        let plan = SyncPlan::compute(&snapshot, &records);
        info!(
            new = plan.new.len(),
            changed = plan.changed.len(),
            unchanged = plan.unchanged.len(),
            removed = plan.removed.len(),
            upload_bytes = plan.upload_bytes,
            "Reconciliation planned"
        );

        self.prepare_folders(&plan, &mut result).await;

        let ledger = Arc::new(SyncLedger::new(self.store.clone(), records));
        self.upload_all(snapshot, &ledger, &mut result).await;
        self.delete_removed(&ledger, &mut result).await;

        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            uploaded = result.files_uploaded,
            unchanged = result.files_unchanged,
            deleted = result.files_deleted,
            failed = result.files_failed,
            folders = result.folders_created,
            bytes = result.bytes_uploaded,
            duration_ms = result.duration_ms,
            "Sync run complete"
        );
        Ok(result)
    }

    // ========================================================================
    // Phases
    // ========================================================================

    async fn scan_and_load(&self) -> Result<(LocalSnapshot, HashMap<RelativePath, FileRecord>)> {
        let snapshot = scanner::scan(&self.options.root)
            .await
            .context("Failed to scan sync root")?;
        let records = self
            .store
            .load_all()
            .await
            .context("Failed to load file records")?;
        Ok((snapshot, records))
    }

    /// Creates the folders needed by the planned uploads
    ///
    /// A folder failure is recorded; the uploads below it will fail on
    /// their own and be retried next run.
    #[tracing::instrument(skip_all)]
    async fn prepare_folders(&self, plan: &SyncPlan, result: &mut SyncResult) {
        let folders = match plan.required_folders(&self.options.remote_prefix) {
            Ok(folders) => folders,
            Err(err) => {
                error!(%err, "Cannot map upload paths under the remote folder");
                result.errors.push(format!("folder mapping: {err}"));
                return;
            }
        };

        let mut builder = FolderCacheBuilder::new(self.provider.clone());
        let report = builder.ensure_folders(folders).await;
        result.folders_created = report.created.len() as u32;
        for (path, reason) in report.failed {
            result.errors.push(format!("folder {path}: {reason}"));
        }
    }

    /// Dispatches every snapshot path to the worker pool and joins it
    #[tracing::instrument(skip_all, fields(files = snapshot.len(), concurrency = self.options.concurrency))]
    async fn upload_all(&self, snapshot: LocalSnapshot, ledger: &Arc<SyncLedger>, result: &mut SyncResult) {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let dispatcher = UploadDispatcher::new(self.provider.clone(), self.options.limits);
        let mut workers = JoinSet::new();

        for entry in snapshot {
            let semaphore = Arc::clone(&semaphore);
            let ledger = Arc::clone(ledger);
            let dispatcher = dispatcher.clone();
            let prefix = self.options.remote_prefix.clone();

            workers.spawn(async move {
                // Claim first so the record is never mistaken for a removal
                let state = ledger.claim(&entry).await;
                if !state.needs_upload() {
                    return FileOutcome::Unchanged;
                }

                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => {
                        return FileOutcome::Failed {
                            path: entry.relative_path.clone(),
                            error: err.to_string(),
                        }
                    }
                };
                upload_one(&dispatcher, &ledger, &prefix, &entry).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(FileOutcome::Unchanged) => result.files_unchanged += 1,
                Ok(FileOutcome::Uploaded { bytes }) => {
                    result.files_uploaded += 1;
                    result.bytes_uploaded += bytes;
                }
                Ok(FileOutcome::Failed { path, error }) => {
                    result.files_failed += 1;
                    result.errors.push(format!("{path}: {error}"));
                }
                Err(join_err) => {
                    error!(error = %join_err, "Upload worker panicked");
                    result.files_failed += 1;
                    result.errors.push(format!("worker: {join_err}"));
                }
            }
        }
    }

    /// Removes remote items whose local file disappeared
    ///
    /// Runs after all workers have joined. A delete answered with "not
    /// found" counts as done. Any other failure keeps the record so the
    /// next run tries again.
    #[tracing::instrument(skip_all)]
    async fn delete_removed(&self, ledger: &SyncLedger, result: &mut SyncResult) {
        for record in ledger.take_remaining().await {
            let path = &record.relative_path;
            match self.provider.delete_item(&record.remote_id).await {
                Ok(outcome) => {
                    if outcome == DeleteOutcome::AlreadyGone {
                        info!(path = %path, remote_id = %record.remote_id, "Remote item already gone");
                    } else {
                        info!(path = %path, remote_id = %record.remote_id, "Deleted remote item");
                    }
                    match ledger.forget(path).await {
                        Ok(_) => result.files_deleted += 1,
                        Err(err) => {
                            warn!(path = %path, error = %format!("{err:#}"), "Failed to drop record");
                            result.files_failed += 1;
                            result.errors.push(format!("{path}: {err:#}"));
                        }
                    }
                }
                Err(err) => {
                    warn!(path = %path, error = %format!("{err:#}"), "Remote delete failed, keeping record");
                    result.files_failed += 1;
                    result.errors.push(format!("{path}: {err:#}"));
                }
            }
        }
    }
}

/// Uploads one entry and records it on success
async fn upload_one(
    dispatcher: &UploadDispatcher,
    ledger: &SyncLedger,
    prefix: &RemotePath,
    entry: &LocalEntry,
) -> FileOutcome {
    let outcome: Result<()> = async {
        let remote_path = RemotePath::for_file(prefix, &entry.relative_path)?;
        let remote_id = dispatcher.upload(entry, &remote_path).await?;
        ledger.commit_upload(entry, remote_id).await
    }
    .await;

    match outcome {
        Ok(()) => FileOutcome::Uploaded {
            bytes: entry.size_bytes,
        },
        Err(err) => {
            let error = format!("{err:#}");
            warn!(path = %entry.relative_path, %error, "Upload failed, will retry next run");
            FileOutcome::Failed {
                path: entry.relative_path.clone(),
                error,
            }
        }
    }
}
