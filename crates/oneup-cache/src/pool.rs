//! SQLite pool for the file record store
//!
//! Three ways in: [`DatabasePool::open`] for a sync run (creates and
//! migrates the file), [`DatabasePool::open_read_only`] for commands that
//! only look at an existing store, and [`DatabasePool::in_memory`] for tests.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Connections kept for a file-backed store
const FILE_POOL_SIZE: u32 = 4;

/// How long a connection waits on a lock held by another writer
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Handle on the SQLite database holding the file records
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the store at `db_path` for reading and writing
    ///
    /// A missing file and its missing parent directories are created, and
    /// the schema is applied before the pool is handed out.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` when the directory or the file cannot be opened,
    /// `MigrationFailed` when the schema cannot be applied.
    pub async fn open(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot create {}: {e}", dir.display()))
            })?;
        }

        let options = base_options(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = connect(db_path, FILE_POOL_SIZE, options).await?;
        apply_schema(&pool).await?;

        tracing::info!(path = %db_path.display(), "Metadata store opened");
        Ok(Self { pool })
    }

    /// Opens an existing store without the right to change it
    ///
    /// Nothing is created on disk and no schema is applied, so a path that
    /// does not hold a store yet is an error.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` when the file is missing or unreadable.
    pub async fn open_read_only(db_path: &Path) -> Result<Self, CacheError> {
        let options = base_options(db_path)
            .create_if_missing(false)
            .read_only(true);
        let pool = connect(db_path, 1, options).await?;

        tracing::debug!(path = %db_path.display(), "Metadata store opened read-only");
        Ok(Self { pool })
    }

    /// Fresh private database, gone when the pool is dropped
    ///
    /// One connection only: every SQLite `:memory:` connection is its own
    /// database.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` or `MigrationFailed`, as for [`DatabasePool::open`].
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory store: {e}")))?;
        apply_schema(&pool).await?;

        tracing::debug!("In-memory metadata store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection, checkpointing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn base_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .busy_timeout(BUSY_TIMEOUT)
}

async fn connect(
    db_path: &Path,
    size: u32,
    options: SqliteConnectOptions,
) -> Result<SqlitePool, CacheError> {
    SqlitePoolOptions::new()
        .max_connections(size)
        .connect_with(options)
        .await
        .map_err(|e| CacheError::ConnectionFailed(format!("{}: {e}", db_path.display())))
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CacheError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
    tracing::debug!("Schema applied");
    Ok(())
}
