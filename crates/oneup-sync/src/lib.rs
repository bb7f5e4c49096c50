//! OneUp Sync - One-way local-to-cloud synchronization engine
//!
//! Provides:
//! - Local tree scanning
//! - Remote folder hierarchy creation
//! - Simple and chunked uploads
//! - Concurrent reconciliation with serialized store updates
//! - Remote deletion of locally removed files
//!
//! ## Modules
//!
//! - [`scanner`] - Recursive walk producing a [`LocalSnapshot`](oneup_core::domain::LocalSnapshot)
//! - [`folders`] - Shallow-to-deep remote folder creation
//! - [`uploader`] - Size-based routing between simple and chunked uploads
//! - [`ledger`] - Single serialization point for store mutations during a run
//! - [`engine`] - Run orchestration, worker pool and deletion pass

pub mod engine;
pub mod folders;
pub mod ledger;
pub mod scanner;
pub mod uploader;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use oneup_core::domain::RemotePath;
use thiserror::Error;

pub use engine::{SyncEngine, SyncOptions, SyncResult};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The sync root cannot be read
    #[error("Sync root unavailable: {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sync root exists but is not a directory
    #[error("Sync root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// The file grew or shrank while it was being read
    #[error("File changed while uploading: {0}")]
    FileChanged(PathBuf),

    /// Every window was accepted but the session never reported completion
    #[error("Upload session for {0} ended without a completed item")]
    IncompleteUpload(RemotePath),

    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A domain-level error propagated from oneup-core
    #[error("Domain error: {0}")]
    DomainError(#[from] oneup_core::domain::errors::DomainError),
}
