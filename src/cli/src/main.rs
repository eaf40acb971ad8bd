//! jobq CLI - Command-line inspection and lifecycle management for the
//! membership background job queue.
//!
//! Provides status, watch, inspect, clear, retry, and configuration
//! commands over the three queue tables.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{clear, config, inspect, retry, status, watch};
use jobq_core::db::JobStore;
use output::OutputFormat;

/// jobq - background job queue administration
#[derive(Parser)]
#[command(
    name = "jobq",
    version = "0.1.0",
    about = "Inspect and manage the background job queue",
    long_about = "Administrative tool for the membership background job queue: \
                  statistics, live monitoring, record inspection, retry of failed \
                  jobs, and criteria-scoped purging.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Database URL (e.g. sqlite://jobs.db)
    #[arg(long, global = true, env = "JOBQ_DATABASE_URL")]
    database_url: Option<String>,

    /// Common prefix of the queue tables
    #[arg(long, global = true, env = "JOBQ_TABLE_PREFIX")]
    prefix: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show queue statistics and a filtered job list
    Status(status::StatusArgs),

    /// Continuously re-poll the queue until interrupted
    Watch(watch::WatchArgs),

    /// Dump a single job record including its decoded payload
    Inspect(inspect::InspectArgs),

    /// Delete jobs matching explicit criteria
    Clear(clear::ClearArgs),

    /// Re-admit failed jobs into the active table
    Retry(retry::RetryArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    jobq_core::telemetry::init(&Default::default());

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        format,
        database_url,
        prefix,
        command,
        ..
    } = cli;

    match command {
        // The config command manages settings on disk and must work without
        // a reachable store.
        Commands::Config(cmd) => config::execute(cmd, format).await,
        command => {
            let store = open_store(database_url, prefix).await?;
            let result = match command {
                Commands::Status(args) => status::execute(args, &store, format).await,
                Commands::Watch(args) => watch::execute(args, &store, format).await,
                Commands::Inspect(args) => inspect::execute(args, &store, format).await,
                Commands::Clear(args) => clear::execute(args, &store, format).await,
                Commands::Retry(args) => retry::execute(args, &store, format).await,
                Commands::Config(_) => unreachable!("handled above"),
            };
            store.close().await;
            result
        }
    }
}

/// Resolve connection settings (flags, then saved configuration, then
/// defaults) and open the store.
async fn open_store(database_url: Option<String>, prefix: Option<String>) -> Result<JobStore> {
    let url = database_url
        .or_else(|| config::load_value("database-url"))
        .unwrap_or_else(|| jobq_core::config::DatabaseConfig::default().url);
    let prefix = prefix
        .or_else(|| config::load_value("table-prefix"))
        .unwrap_or_default();

    let store = JobStore::connect(&url, &prefix)
        .await
        .with_context(|| format!("Failed to open job store at {}", url))?;
    store
        .migrate()
        .await
        .context("Failed to prepare queue tables")?;

    Ok(store)
}
