//! Retry command.
//!
//! Re-admits one failed job by id, or a capped, class-filtered batch when no
//! id is given.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use jobq_core::db::JobStore;
use jobq_core::jobs::{RetryController, RetryPreview, DEFAULT_RETRY_LIMIT};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RetryArgs {
    /// Failed-table job id (omit to retry in bulk)
    job_id: Option<i64>,

    /// Filter bulk retry by class (exact match)
    #[arg(short, long)]
    class: Option<String>,

    /// Maximum jobs retried in bulk mode
    #[arg(short, long, default_value_t = DEFAULT_RETRY_LIMIT)]
    limit: i64,

    /// Report what would be retried without mutating
    #[arg(long)]
    dry_run: bool,
}

/// Row in the dry-run preview table.
#[derive(Debug, Serialize, Tabled)]
struct PreviewRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl PreviewRow {
    fn from_preview(preview: &RetryPreview) -> Self {
        Self {
            id: preview.id,
            class: preview.class.clone(),
            reason: preview.reason.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub async fn execute(args: RetryArgs, store: &JobStore, format: OutputFormat) -> Result<()> {
    let controller = RetryController::new(store.clone());

    if let Some(job_id) = args.job_id {
        let retried = controller.retry_job(job_id, args.dry_run).await?;

        match format {
            OutputFormat::Table => {
                if retried.dry_run {
                    output::print_info(&format!(
                        "Would retry job {} ({})",
                        retried.old_id, retried.class
                    ));
                } else {
                    output::print_success(&format!(
                        "Retried job {} ({}) as job {}",
                        retried.old_id,
                        retried.class,
                        retried.new_id.unwrap_or_default()
                    ));
                }
            }
            _ => output::print_item(&retried, format),
        }
        return Ok(());
    }

    let summary = controller
        .retry_matching(args.class.as_deref(), args.limit, args.dry_run)
        .await?;

    match format {
        OutputFormat::Table => {
            if summary.dry_run {
                let rows: Vec<PreviewRow> =
                    summary.preview.iter().map(PreviewRow::from_preview).collect();
                output::print_list(&rows, format);
                output::print_info(&format!("Would retry {} job(s)", summary.attempted));
            } else {
                output::print_success(&format!(
                    "Retried {} of {} job(s)",
                    summary.retried, summary.attempted
                ));
                for error in &summary.errors {
                    output::print_error(error);
                }
                if summary.errors_truncated > 0 {
                    output::print_error(&format!(
                        "... and {} more error(s)",
                        summary.errors_truncated
                    ));
                }
            }
        }
        _ => output::print_item(&summary, format),
    }

    Ok(())
}
