//! Queue status command.
//!
//! Prints the statistics block followed by a filtered job list. Listings
//! spanning several tables are concatenated per table, each chunk newest
//! first.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use jobq_core::db::{JobStore, TABLE_LIST_CAP};
use jobq_core::jobs::{self, JobStatus, JobSummary, ListRequest, QueueStats};

use crate::commands::{format_opt_time, format_time};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    /// Filter by status (pending, working, complete, failed)
    #[arg(short, long)]
    status: Option<JobStatus>,

    /// Filter by job class (exact match)
    #[arg(short, long)]
    class: Option<String>,

    /// Maximum rows listed per table
    #[arg(short, long, default_value_t = TABLE_LIST_CAP)]
    limit: i64,
}

/// Row in the job listing table.
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: i64,
    #[tabled(rename = "Tries")]
    tries: i64,
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "Last Run")]
    lastrun: String,
}

impl JobRow {
    fn from_summary(job: &JobSummary) -> Self {
        Self {
            id: job.id,
            class: job.class.clone(),
            status: job.status.to_string(),
            priority: job.priority,
            tries: job.tries,
            created_at: format_time(job.created_at),
            lastrun: format_opt_time(job.lastrun),
        }
    }
}

pub async fn execute(args: StatusArgs, store: &JobStore, format: OutputFormat) -> Result<()> {
    let stats = QueueStats::collect(store).await?;

    let mut request = ListRequest::default().with_limit(args.limit);
    if let Some(status) = args.status {
        request = request.with_status(status);
    }
    if let Some(class) = args.class {
        request = request.with_class(class);
    }
    let listed = jobs::list(store, &request).await?;

    match format {
        OutputFormat::Table => {
            output::print_header("Queue Statistics");
            output::print_detail("Pending", &stats.pending.to_string());
            output::print_detail("Working", &stats.working.to_string());
            output::print_detail("Completed", &stats.completed.to_string());
            output::print_detail("Failed", &stats.failed.to_string());
            output::print_detail("Total", &stats.total.to_string());
            println!();

            let rows: Vec<JobRow> = listed.iter().map(JobRow::from_summary).collect();
            output::print_list(&rows, format);
        }
        OutputFormat::Csv => {
            let rows: Vec<JobRow> = listed.iter().map(JobRow::from_summary).collect();
            output::print_list(&rows, format);
        }
        OutputFormat::Json => {
            output::print_item(
                &serde_json::json!({ "statistics": stats, "jobs": listed }),
                format,
            );
        }
    }

    Ok(())
}
