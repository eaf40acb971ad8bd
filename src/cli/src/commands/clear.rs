//! Criteria-scoped purge command.
//!
//! Requires at least one filter; an unscoped clear is rejected before any
//! table is touched.

use anyhow::Result;
use clap::Args;

use jobq_core::db::JobStore;
use jobq_core::jobs::{JobStatus, PurgeController, PurgeCriteria};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ClearArgs {
    /// Only jobs with this status (pending, working, complete, failed)
    #[arg(short, long)]
    status: Option<JobStatus>,

    /// Only jobs of this class (exact match)
    #[arg(short, long)]
    class: Option<String>,

    /// Only jobs created more than this many hours ago
    #[arg(long, value_name = "HOURS")]
    older_than: Option<u64>,

    /// Report what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: ClearArgs, store: &JobStore, format: OutputFormat) -> Result<()> {
    let criteria = PurgeCriteria {
        status: args.status,
        class: args.class,
        older_than_hours: args.older_than,
    };

    let summary = PurgeController::new(store.clone())
        .clear(&criteria, args.dry_run)
        .await?;

    match format {
        OutputFormat::Table => {
            for table in &summary.tables {
                output::print_detail(&table.table.to_string(), &table.matched.to_string());
            }
            if summary.dry_run {
                output::print_info(&format!("Would delete {} job(s)", summary.total));
            } else {
                output::print_success(&format!("Deleted {} job(s)", summary.total));
            }
        }
        _ => output::print_item(&summary, format),
    }

    Ok(())
}
