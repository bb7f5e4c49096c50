//! Domain error types
//!
//! Validation failures raised while constructing paths, identifiers and
//! transfer windows.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid root-relative path
    #[error("Invalid relative path: {0}")]
    InvalidRelativePath(String),

    /// Path is not located under the sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Byte range with start after end, or beyond the file size
    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
