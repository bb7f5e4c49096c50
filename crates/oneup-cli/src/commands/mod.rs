//! CLI subcommands

pub mod config;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use oneup_cache::{DatabasePool, SqliteMetadataStore};
use oneup_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// What every command gets handed: the loaded configuration and where it
/// came from
pub struct CommandContext {
    pub config: Config,
    pub config_path: PathBuf,
    /// Whether `config_path` existed; defaults are used otherwise
    pub config_found: bool,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Loads the configuration
    ///
    /// An explicit `--config` path must exist and parse. The default path
    /// may be absent, in which case built-in defaults apply.
    pub fn load(explicit: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let (config_path, required) = match explicit {
            Some(path) => (path, true),
            None => (Config::default_path(), false),
        };

        let config_found = config_path.is_file();
        let mut config = if config_found || required {
            Config::load(&config_path).with_context(|| {
                format!("Failed to load configuration from {}", config_path.display())
            })?
        } else {
            Config::default()
        };
        config.sync.root = expand_tilde(&config.sync.root);
        config.sync.database = expand_tilde(&config.sync.database);
        config.logging.file = config.logging.file.as_deref().map(expand_tilde);

        Ok(Self {
            config,
            config_path,
            config_found,
            format,
        })
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }
}

/// Opens the metadata store named by `sync.database`
pub async fn open_store(config: &Config) -> Result<(DatabasePool, Arc<SqliteMetadataStore>)> {
    let pool = DatabasePool::open(&config.sync.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open metadata store {}",
                config.sync.database.display()
            )
        })?;
    let store = Arc::new(SqliteMetadataStore::new(pool.pool().clone()));
    Ok((pool, store))
}

/// Maps a command's success flag to the process exit status
pub fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Replaces a leading `~` with the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
