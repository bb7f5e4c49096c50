//! Configuration module for OneUp.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, RemotePath};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for OneUp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub transfer: TransferConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory whose contents are uploaded.
    pub root: PathBuf,
    /// Remote folder (below the drive root) that mirrors `root`.
    pub remote_folder: String,
    /// SQLite database holding the records of uploaded files.
    pub database: PathBuf,
}

/// Upload routing and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files strictly smaller than this (in KiB) use a single-request upload.
    pub small_file_threshold_kb: u64,
    /// Window size (in KiB) of a chunked upload. Must be a multiple of 320.
    pub chunk_size_kb: u64,
    /// Remote timestamps are patched only for files larger than this (in KiB).
    pub skip_metadata_threshold_kb: u64,
    /// Maximum number of files transferred at the same time.
    pub concurrency: usize,
}

/// Transport retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub initial_backoff_ms: u64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
    /// Optional log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Azure AD Application (client) ID, needed to refresh stored tokens.
    pub app_id: Option<String>,
    /// Keyring account under which the tokens are stored.
    pub account: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/oneup/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("oneup")
            .join("config.yaml")
    }

    /// Serialize to YAML, as written in a config file.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl SyncConfig {
    /// The remote folder as a validated remote path.
    pub fn remote_prefix(&self) -> Result<RemotePath, DomainError> {
        RemotePath::from_prefix(&self.remote_folder)
    }
}

impl TransferConfig {
    pub fn small_file_threshold_bytes(&self) -> u64 {
        self.small_file_threshold_kb * 1024
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_kb * 1024
    }

    pub fn skip_metadata_threshold_bytes(&self) -> u64 {
        self.skip_metadata_threshold_kb * 1024
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("OneUp"),
            remote_folder: "OneUp".to_string(),
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("oneup")
                .join("oneup.db"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            small_file_threshold_kb: 4 * 1024,
            chunk_size_kb: 5 * 1024,
            skip_metadata_threshold_kb: 1024,
            concurrency: 5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.chunk_size_kb"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Upload session windows must be multiples of 320 KiB.
const CHUNK_ALIGNMENT_KB: u64 = 320;

/// Largest window accepted by an upload session (60 MiB).
const MAX_CHUNK_SIZE_KB: u64 = 60 * 1024;

/// Largest file accepted by the single-request upload (4 MiB).
const MAX_SMALL_FILE_THRESHOLD_KB: u64 = 4 * 1024;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- sync ---
        // Check sync root only when it does not start with `~` (tilde is expanded at runtime).
        let root_str = self.sync.root.to_string_lossy();
        if !root_str.starts_with('~') && !self.sync.root.is_dir() {
            push(
                "sync.root",
                format!("directory does not exist: {}", self.sync.root.display()),
            );
        }
        if let Err(e) = self.sync.remote_prefix() {
            push("sync.remote_folder", e.to_string());
        }
        if self.sync.database.as_os_str().is_empty() {
            push("sync.database", "must not be empty".into());
        }

        // --- transfer ---
        if self.transfer.small_file_threshold_kb == 0 {
            push("transfer.small_file_threshold_kb", "must be greater than 0".into());
        } else if self.transfer.small_file_threshold_kb > MAX_SMALL_FILE_THRESHOLD_KB {
            push(
                "transfer.small_file_threshold_kb",
                format!("must not exceed {MAX_SMALL_FILE_THRESHOLD_KB}"),
            );
        }
        if self.transfer.chunk_size_kb == 0 {
            push("transfer.chunk_size_kb", "must be greater than 0".into());
        } else if self.transfer.chunk_size_kb % CHUNK_ALIGNMENT_KB != 0 {
            push(
                "transfer.chunk_size_kb",
                format!("must be a multiple of {CHUNK_ALIGNMENT_KB}"),
            );
        } else if self.transfer.chunk_size_kb > MAX_CHUNK_SIZE_KB {
            push(
                "transfer.chunk_size_kb",
                format!("must not exceed {MAX_CHUNK_SIZE_KB}"),
            );
        }
        if self.transfer.concurrency == 0 {
            push("transfer.concurrency", "must be greater than 0".into());
        }

        // --- retry ---
        if self.retry.max_attempts == 0 {
            push("retry.max_attempts", "must be greater than 0".into());
        }
        if self.retry.request_timeout_secs == 0 {
            push("retry.request_timeout_secs", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format",
                format!(
                    "invalid format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and lets callers override individual fields.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- sync ---

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = root;
        self
    }

    pub fn sync_remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.sync.remote_folder = folder.into();
        self
    }

    pub fn sync_database(mut self, database: PathBuf) -> Self {
        self.config.sync.database = database;
        self
    }

    // --- transfer ---

    pub fn transfer_small_file_threshold_kb(mut self, kb: u64) -> Self {
        self.config.transfer.small_file_threshold_kb = kb;
        self
    }

    pub fn transfer_chunk_size_kb(mut self, kb: u64) -> Self {
        self.config.transfer.chunk_size_kb = kb;
        self
    }

    pub fn transfer_skip_metadata_threshold_kb(mut self, kb: u64) -> Self {
        self.config.transfer.skip_metadata_threshold_kb = kb;
        self
    }

    pub fn transfer_concurrency(mut self, n: usize) -> Self {
        self.config.transfer.concurrency = n;
        self
    }

    // --- retry ---

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry.initial_backoff_ms = ms;
        self
    }

    pub fn retry_request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.retry.request_timeout_secs = secs;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- auth ---

    pub fn auth_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.auth.app_id = Some(app_id.into());
        self
    }

    pub fn auth_account(mut self, account: impl Into<String>) -> Self {
        self.config.auth.account = Some(account.into());
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
