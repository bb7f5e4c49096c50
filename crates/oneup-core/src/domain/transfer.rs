//! Chunked transfer types
//!
//! Large files are sent through a resumable upload session in fixed-size
//! windows. [`chunk_ranges`] computes the windows, [`UploadSession`] tracks
//! how many bytes the remote side has acknowledged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Inclusive byte window `[start, end]` of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Creates a range, rejecting `start > end`
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRange` for an empty or inverted range
    pub fn new(start: u64, end: u64) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvalidRange(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false, a range covers at least one byte
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for a file of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Splits `total` bytes into consecutive windows of `chunk_size` bytes
///
/// Every window but the last is exactly `chunk_size` long; the windows are
/// contiguous, non-overlapping and end at byte `total - 1`. A zero-length
/// file yields no windows.
///
/// # Errors
/// Returns `DomainError::ValidationFailed` if `chunk_size` is zero
pub fn chunk_ranges(total: u64, chunk_size: u64) -> Result<Vec<ByteRange>, DomainError> {
    if chunk_size == 0 {
        return Err(DomainError::ValidationFailed(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut ranges = Vec::with_capacity(total.div_ceil(chunk_size) as usize);
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total) - 1;
        ranges.push(ByteRange { start, end });
        start = end + 1;
    }
    Ok(ranges)
}

/// A resumable upload session opened on the remote store
///
/// Lives only for the duration of one chunked transfer. It is not persisted,
/// so a transfer interrupted by a process restart starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Pre-authenticated URL that receives the chunk PUTs
    pub upload_url: String,
    /// Total size of the file being sent
    pub total_size: u64,
    /// Bytes acknowledged so far
    pub bytes_confirmed: u64,
    /// Expiry announced by the server, if any
    pub expires_at: Option<DateTime<Utc>>,
}

impl UploadSession {
    pub fn new(upload_url: String, total_size: u64, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            upload_url,
            total_size,
            bytes_confirmed: 0,
            expires_at,
        }
    }

    /// Records that `range` was accepted
    pub fn confirm(&mut self, range: &ByteRange) {
        self.bytes_confirmed = self.bytes_confirmed.max(range.end + 1);
    }

    pub fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.bytes_confirmed)
    }
}
