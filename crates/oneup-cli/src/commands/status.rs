//! Status command - Display what the metadata store tracks
//!
//! Provides the `oneup status` CLI command which:
//! 1. Shows the number and total size of tracked files
//! 2. Shows the stored record of a single file when a path is given

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use oneup_core::domain::{FileRecord, RelativePath};
use oneup_core::ports::IMetadataStore;

use super::{exit_code, open_store, CommandContext};
use crate::output::{human_bytes, plural};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Path relative to the sync root, e.g. `photos/2024/a.jpg`
    pub path: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = &ctx.config;

        if !ctx.config_found {
            formatter.warn(&format!(
                "No configuration file at {}, using defaults",
                ctx.config_path.display()
            ));
        }

        if !config.sync.database.exists() {
            formatter.error("No metadata store found. Run 'oneup sync' first.");
            return Ok(ExitCode::FAILURE);
        }

        let (pool, store) = open_store(config).await?;

        let code = match &self.path {
            Some(raw) => {
                let path = RelativePath::new(raw.trim_matches('/').to_string())
                    .with_context(|| format!("Invalid relative path '{raw}'"))?;
                let record = store
                    .get(&path)
                    .await
                    .with_context(|| format!("Failed to read record for {path}"))?;
                show_record(ctx, &path, record.as_ref())?
            }
            None => {
                let (files, bytes) = store.totals().await.context("Failed to count records")?;
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "root": config.sync.root,
                        "remote_folder": config.sync.remote_folder,
                        "database": config.sync.database,
                        "tracked_files": files,
                        "tracked_bytes": bytes,
                    }));
                } else {
                    formatter.success(&format!(
                        "Tracking {} ({})",
                        plural(files, "file"),
                        human_bytes(bytes)
                    ));
                    formatter.info(&format!("Local root:    {}", config.sync.root.display()));
                    formatter.info(&format!("Remote folder: {}", config.sync.remote_folder));
                    formatter.info(&format!("Store:         {}", config.sync.database.display()));
                }
                ExitCode::SUCCESS
            }
        };

        pool.close().await;
        Ok(code)
    }
}

fn show_record(
    ctx: &CommandContext,
    path: &RelativePath,
    record: Option<&FileRecord>,
) -> Result<ExitCode> {
    let formatter = ctx.formatter();

    if ctx.is_json() {
        let value = serde_json::to_value(record).context("Failed to serialize record")?;
        formatter.print_json(&serde_json::json!({ "path": path, "record": value }));
        return Ok(exit_code(record.is_some()));
    }

    match record {
        Some(record) => {
            formatter.success(&format!("{path} is tracked"));
            formatter.info(&format!("Remote id: {}", record.remote_id));
            formatter.info(&format!("Size:      {}", human_bytes(record.size_bytes)));
            formatter.info(&format!("Modified:  {}", record.modified_at.to_rfc3339()));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            formatter.error(&format!("{path} is not tracked"));
            Ok(ExitCode::FAILURE)
        }
    }
}
