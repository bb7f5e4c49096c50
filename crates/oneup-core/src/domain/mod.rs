//! Domain entities and business logic
//!
//! This module contains the core domain types for OneUp:
//! - Newtypes for validated local and remote paths and item identifiers
//! - Store records and local snapshots
//! - Chunked transfer windows and upload sessions
//! - The reconciliation plan
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod plan;
pub mod record;
pub mod snapshot;
pub mod transfer;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use plan::{PathState, SyncPlan};
pub use record::FileRecord;
pub use snapshot::{LocalEntry, LocalSnapshot};
pub use transfer::{chunk_ranges, ByteRange, UploadSession};
