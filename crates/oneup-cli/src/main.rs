//! OneUp CLI - Command-line interface for OneUp
//!
//! Provides commands for:
//! - Mirroring a local directory to OneDrive
//! - Viewing what the last runs recorded
//! - Inspecting and validating configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::{config::ConfigCommand, status::StatusCommand, sync::SyncCommand, CommandContext};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "oneup", version, about = "One-way backup of a local directory to OneDrive")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload new and changed files, delete remote copies of removed ones
    Sync(SyncCommand),
    /// Show what the metadata store currently tracks
    Status(StatusCommand),
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match run(cli, format).await {
        Ok(code) => code,
        Err(e) => {
            get_formatter(cli_json(format)).error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, format: OutputFormat) -> Result<ExitCode> {
    let ctx = CommandContext::load(cli.config.clone(), format)?;

    // `config validate` must still be able to report a bad logging section
    if let Err(e) = logging::init_tracing(&ctx.config.logging, cli.verbose, cli.quiet) {
        if !matches!(cli.command, Commands::Config(_)) {
            return Err(e);
        }
    }

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}

fn cli_json(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}
