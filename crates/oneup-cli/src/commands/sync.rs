//! Sync command - Mirror the local directory to OneDrive
//!
//! Provides the `oneup sync` CLI command which:
//! 1. Applies `--root`/`--remote` over the configuration and validates it
//! 2. Opens the metadata store
//! 3. Builds the token provider and the Graph adapter
//! 4. Runs the SyncEngine and displays the summary

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use tracing::{debug, info};

use oneup_cache::{DatabasePool, SqliteMetadataStore};
use oneup_core::config::{Config, ConfigBuilder};
use oneup_core::domain::{FileRecord, RelativePath, SyncPlan};
use oneup_core::ports::{IMetadataStore, ITokenProvider};
use oneup_graph::auth::{
    KeyringTokenProvider, KeyringTokenStorage, OAuth2Config, RefreshFlow, StaticTokenProvider,
};
use oneup_graph::client::GraphClient;
use oneup_graph::provider::GraphCloudProvider;
use oneup_graph::retry::RetryPolicy;
use oneup_sync::{scanner, SyncEngine, SyncOptions, SyncResult};

use super::{exit_code, open_store, CommandContext};
use crate::output::{human_bytes, plural, OutputFormatter};

/// Environment variable holding a ready-to-use access token
pub const ACCESS_TOKEN_ENV: &str = "ONEUP_ACCESS_TOKEN";

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local directory to mirror (overrides sync.root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Remote folder receiving the tree (overrides sync.remote_folder)
    #[arg(long)]
    pub remote: Option<String>,

    /// Show what would be uploaded and deleted without contacting OneDrive
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();

        let config = match self.effective_config(&ctx.config) {
            Ok(config) => config,
            Err(errors) => {
                for error in &errors {
                    formatter.error(&format!("{} - {}", error.field, error.message));
                }
                bail!("Configuration has {} error(s)", errors.len());
            }
        };

        info!(
            root = %config.sync.root.display(),
            remote = %config.sync.remote_folder,
            config_path = %ctx.config_path.display(),
            "Starting sync"
        );

        if self.dry_run {
            let snapshot = scanner::scan(&config.sync.root)
                .await
                .context("Failed to scan sync root")?;
            let records = stored_records(&config.sync.database).await?;
            let plan = SyncPlan::compute(&snapshot, &records);
            show_plan(&plan, ctx.is_json(), formatter.as_ref())?;
            return Ok(ExitCode::SUCCESS);
        }

        let tokens = token_provider(&config)?;
        let client = GraphClient::new(tokens, config.retry.request_timeout())
            .context("Failed to build HTTP client")?
            .with_retry_policy(RetryPolicy::from_config(&config.retry));
        let provider = Arc::new(GraphCloudProvider::new(client));
        let options = SyncOptions::from_config(&config)?;
        let (pool, store) = open_store(&config).await?;

        let engine = SyncEngine::new(provider, store, options);
        formatter.info("Starting synchronization...");
        let outcome = engine.sync().await;
        pool.close().await;
        let result = outcome?;

        show_result(&result, ctx.is_json(), formatter.as_ref())?;

        Ok(exit_code(result.is_clean()))
    }

    /// Configuration with the command-line overrides applied, validated
    fn effective_config(
        &self,
        base: &Config,
    ) -> Result<Config, Vec<oneup_core::config::ValidationError>> {
        let mut builder = ConfigBuilder::from_config(base.clone());
        if let Some(root) = &self.root {
            builder = builder.sync_root(root.clone());
        }
        if let Some(remote) = &self.remote {
            builder = builder.sync_remote_folder(remote.clone());
        }
        builder.build_validated()
    }
}

/// Records a dry run plans against, read without touching the disk
///
/// A store that does not exist yet means nothing has been uploaded.
async fn stored_records(database: &Path) -> Result<HashMap<RelativePath, FileRecord>> {
    if !database.is_file() {
        debug!(database = %database.display(), "No metadata store yet, planning from scratch");
        return Ok(HashMap::new());
    }

    let pool = DatabasePool::open_read_only(database)
        .await
        .with_context(|| format!("Failed to open metadata store {}", database.display()))?;
    let records = SqliteMetadataStore::new(pool.pool().clone())
        .load_all()
        .await
        .context("Failed to load stored records");
    pool.close().await;
    records
}

/// Chooses where the bearer token comes from
///
/// `ONEUP_ACCESS_TOKEN` wins; otherwise tokens stored in the system
/// keyring for `auth.account` are used and refreshed through `auth.app_id`.
fn token_provider(config: &Config) -> Result<Arc<dyn ITokenProvider>> {
    if let Some(token) = std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
    {
        info!("Using access token from environment");
        return Ok(Arc::new(StaticTokenProvider::new(token.trim())));
    }

    let account = config.auth.account.clone().ok_or_else(|| {
        anyhow!("No credentials: set {ACCESS_TOKEN_ENV} or configure auth.account")
    })?;
    let flow = config
        .auth
        .app_id
        .as_deref()
        .map(|app_id| RefreshFlow::new(&OAuth2Config::new(app_id)))
        .transpose()?;

    info!(account = %account, refresh = flow.is_some(), "Using keyring credentials");
    Ok(Arc::new(KeyringTokenProvider::new(
        KeyringTokenStorage::new(account),
        flow,
    )))
}

fn show_plan(plan: &SyncPlan, json: bool, formatter: &dyn OutputFormatter) -> Result<()> {
    if json {
        let value = serde_json::to_value(plan).context("Failed to serialize plan")?;
        formatter.print_json(&value);
        return Ok(());
    }

    if plan.is_noop() {
        formatter.success("Dry run: already up to date");
        return Ok(());
    }

    formatter.success(&format!(
        "Dry run: {} to upload ({}), {} to delete",
        plural((plan.new.len() + plan.changed.len()) as u64, "file"),
        human_bytes(plan.upload_bytes),
        plural(plan.removed.len() as u64, "file"),
    ));
    for path in &plan.new {
        formatter.info(&format!("+ {path}"));
    }
    for path in &plan.changed {
        formatter.info(&format!("~ {path}"));
    }
    for record in &plan.removed {
        formatter.info(&format!("- {}", record.relative_path));
    }
    Ok(())
}

fn show_result(result: &SyncResult, json: bool, formatter: &dyn OutputFormatter) -> Result<()> {
    if json {
        let value = serde_json::to_value(result).context("Failed to serialize result")?;
        formatter.print_json(&value);
        return Ok(());
    }

    let duration_display = if result.duration_ms >= 1000 {
        format!("{:.1}s", result.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", result.duration_ms)
    };

    let touched = result.files_uploaded + result.files_deleted + result.files_failed;
    if touched == 0 && result.errors.is_empty() {
        formatter.success("Already up to date");
    } else {
        formatter.success(&format!("Sync completed in {duration_display}"));
    }

    if result.folders_created > 0 {
        formatter.info(&format!(
            "Created:   {}",
            plural(result.folders_created.into(), "folder")
        ));
    }
    if result.files_uploaded > 0 {
        formatter.info(&format!(
            "Uploaded:  {} ({})",
            plural(result.files_uploaded.into(), "file"),
            human_bytes(result.bytes_uploaded)
        ));
    }
    if result.files_deleted > 0 {
        formatter.info(&format!(
            "Deleted:   {}",
            plural(result.files_deleted.into(), "file")
        ));
    }
    formatter.info(&format!(
        "Unchanged: {}",
        plural(result.files_unchanged.into(), "file")
    ));

    if !result.errors.is_empty() {
        formatter.error(&format!(
            "{} occurred, failed items are retried on the next run:",
            plural(result.errors.len() as u64, "error")
        ));
        for err in &result.errors {
            formatter.info(&format!("  - {err}"));
        }
    }
    Ok(())
}
