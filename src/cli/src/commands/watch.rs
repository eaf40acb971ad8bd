//! Live queue monitor command.
//!
//! Re-polls statistics on an interval until interrupted, printing per-field
//! deltas and a short listing of not-yet-finished jobs on each tick.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::*;
use tokio::sync::watch;

use jobq_core::db::JobStore;
use jobq_core::jobs::{format_delta, JobStatus, Monitor, MonitorConfig, Tick};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between polls (minimum 1)
    #[arg(short, long, default_value = "5")]
    interval: u64,

    /// Only print ticks whose statistics changed
    #[arg(long)]
    changes_only: bool,

    /// Filter the listed jobs by status
    #[arg(short, long)]
    status: Option<JobStatus>,

    /// Filter the listed jobs by class (exact match)
    #[arg(short, long)]
    class: Option<String>,
}

pub async fn execute(args: WatchArgs, store: &JobStore, format: OutputFormat) -> Result<()> {
    let config = MonitorConfig::new(Duration::from_secs(args.interval))?
        .with_changes_only(args.changes_only)
        .with_status(args.status)
        .with_class(args.class);
    let monitor = Monitor::new(store.clone(), config);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    if matches!(format, OutputFormat::Table) {
        output::print_info(&format!(
            "Watching queue every {}s (Ctrl-C to stop)",
            args.interval
        ));
    }

    monitor.run(stop_rx, |tick| print_tick(&tick, format)).await?;

    if matches!(format, OutputFormat::Table) {
        output::print_info("Watch stopped");
    }
    Ok(())
}

fn print_tick(tick: &Tick, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let delta = tick.delta.unwrap_or_default();
            println!(
                "[{}] {} | {} | {} | {} | {}",
                chrono::Utc::now().format("%H:%M:%S"),
                stat_cell("pending", tick.stats.pending, delta.pending),
                stat_cell("working", tick.stats.working, delta.working),
                stat_cell("completed", tick.stats.completed, delta.completed),
                stat_cell("failed", tick.stats.failed, delta.failed),
                stat_cell("total", tick.stats.total, delta.total),
            );

            for job in &tick.jobs {
                println!(
                    "  #{} {} {} prio {} tries {}",
                    job.id,
                    job.class,
                    job.status.to_string().dimmed(),
                    job.priority,
                    job.tries
                );
            }
            if tick.more > 0 {
                println!("  {}", format!("... and {} more", tick.more).dimmed());
            }
        }
        _ => output::print_item(tick, format),
    }
}

/// One statistics cell: name, value, and the delta since the previous tick
/// when it changed.
fn stat_cell(name: &str, value: u64, delta: i64) -> String {
    let rendered = format_delta(delta);
    if rendered.is_empty() {
        format!("{name} {value}")
    } else {
        format!("{name} {value} {rendered}")
    }
}

/// Wait for an interrupt.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
