//! Config command - View and check OneUp configuration
//!
//! Provides the `oneup config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration and reports every error found

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use super::{exit_code, CommandContext};
use crate::output::plural;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => execute_show(ctx).map(exit_code),
            ConfigCommand::Validate => execute_validate(ctx).map(exit_code),
        }
    }
}

fn source_label(ctx: &CommandContext) -> String {
    if ctx.config_found {
        ctx.config_path.display().to_string()
    } else {
        format!("defaults, no file at {}", ctx.config_path.display())
    }
}

fn execute_show(ctx: &CommandContext) -> Result<bool> {
    let formatter = ctx.formatter();

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json = serde_json::to_value(&ctx.config)
            .context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", source_label(ctx)));
        formatter.info("");
        for line in ctx.config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }

    Ok(true)
}

/// # Returns
/// Whether the configuration is valid
fn execute_validate(ctx: &CommandContext) -> Result<bool> {
    let formatter = ctx.formatter();

    info!(config_path = %ctx.config_path.display(), "Validating configuration");

    let errors = ctx.config.validate();

    if ctx.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": ctx.config_path.display().to_string(),
            "config_found": ctx.config_found,
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("Source: {}", source_label(ctx)));
    } else {
        formatter.error(&format!(
            "Configuration has {}:",
            plural(errors.len() as u64, "error")
        ));
        formatter.info(&format!("Source: {}", source_label(ctx)));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(errors.is_empty())
}
