//! SQLite implementation of IMetadataStore
//!
//! ## Type Mapping
//!
//! | Domain Type   | SQL Type | Strategy                                              |
//! |---------------|----------|-------------------------------------------------------|
//! | RelativePath  | TEXT     | `.as_str()` / `RelativePath::new()`                   |
//! | RemoteId      | TEXT     | `.as_str()` / `RemoteId::new()`                       |
//! | DateTime<Utc> | TEXT     | RFC 3339 with nanoseconds / `parse_from_rfc3339()`    |
//! | u64 size      | INTEGER  | checked conversion through `i64`                      |
//!
//! Timestamps keep full nanosecond precision so that a value read back
//! compares equal to the one taken from the filesystem.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use oneup_core::domain::{FileRecord, RelativePath, RemoteId};
use oneup_core::ports::IMetadataStore;

use crate::CacheError;

/// SQLite-based implementation of the metadata store port
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row conversion
// ============================================================================

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn size_to_sql(size: u64) -> Result<i64, CacheError> {
    i64::try_from(size)
        .map_err(|_| CacheError::SerializationError(format!("Size {} exceeds SQLite INTEGER", size)))
}

fn record_from_row(row: &SqliteRow) -> Result<FileRecord, CacheError> {
    let path_str: String = row.get("relative_path");
    let modified_str: String = row.get("modified_at");
    let size: i64 = row.get("size_bytes");
    let remote_id_str: String = row.get("remote_id");

    let relative_path = RelativePath::new(path_str.clone()).map_err(|e| {
        CacheError::SerializationError(format!("Invalid relative path '{}': {}", path_str, e))
    })?;
    let remote_id = RemoteId::new(remote_id_str.clone()).map_err(|e| {
        CacheError::SerializationError(format!("Invalid RemoteId '{}': {}", remote_id_str, e))
    })?;
    let size_bytes = u64::try_from(size)
        .map_err(|_| CacheError::SerializationError(format!("Negative size {}", size)))?;

    Ok(FileRecord::new(
        relative_path,
        parse_datetime(&modified_str)?,
        size_bytes,
        remote_id,
    ))
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn load_all(&self) -> anyhow::Result<HashMap<RelativePath, FileRecord>> {
        let rows = sqlx::query(
            "SELECT relative_path, modified_at, size_bytes, remote_id FROM files",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = HashMap::with_capacity(rows.len());
        for row in &rows {
            let record = record_from_row(row)?;
            records.insert(record.relative_path.clone(), record);
        }

        tracing::debug!(count = records.len(), "Loaded file records");
        Ok(records)
    }

    async fn get(&self, path: &RelativePath) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT relative_path, modified_at, size_bytes, remote_id FROM files \
             WHERE relative_path = ?",
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &FileRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO files (relative_path, modified_at, size_bytes, remote_id) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(relative_path) DO UPDATE SET \
                 modified_at = excluded.modified_at, \
                 size_bytes = excluded.size_bytes, \
                 remote_id = excluded.remote_id",
        )
        .bind(record.relative_path.as_str())
        .bind(format_datetime(&record.modified_at))
        .bind(size_to_sql(record.size_bytes)?)
        .bind(record.remote_id.as_str())
        .execute(&self.pool)
        .await?;

        tracing::trace!(path = %record.relative_path, remote_id = %record.remote_id, "Saved file record");
        Ok(())
    }

    async fn delete(&self, path: &RelativePath) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE relative_path = ?")
            .bind(path.as_str())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        tracing::trace!(path = %path, removed, "Deleted file record");
        Ok(removed)
    }

    async fn totals(&self) -> anyhow::Result<(u64, u64)> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count, COALESCE(SUM(size_bytes), 0) AS bytes FROM files",
        )
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        let bytes: i64 = row.get("bytes");
        Ok((count.max(0) as u64, bytes.max(0) as u64))
    }
}
