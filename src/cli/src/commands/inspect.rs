//! Single-record inspection command.

use anyhow::Result;
use clap::Args;

use jobq_core::db::JobStore;
use jobq_core::jobs::{self, QueueTable};

use crate::commands::{format_opt_time, format_time};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct InspectArgs {
    /// Job id to look up
    job_id: i64,

    /// Table to look in (jobs, completed, failed)
    #[arg(short, long, default_value = "jobs")]
    table: QueueTable,
}

pub async fn execute(args: InspectArgs, store: &JobStore, format: OutputFormat) -> Result<()> {
    let detail = jobs::inspect(store, args.table, args.job_id).await?;

    match format {
        OutputFormat::Table => {
            let record = &detail.record;
            output::print_header(&format!("Job {} ({})", record.id, args.table));
            output::print_detail("Class", &record.class);
            output::print_detail("Status", record.status.as_str());
            output::print_detail("Priority", &record.priority.to_string());
            output::print_detail("Tries", &record.tries.to_string());
            output::print_detail("Batch", record.batch.as_deref().unwrap_or("-"));
            output::print_detail("Reason", record.reason.as_deref().unwrap_or("-"));
            output::print_detail("Created", &format_time(record.created_at));
            output::print_detail("First Run", &format_opt_time(record.firstrun));
            output::print_detail("Last Run", &format_opt_time(record.lastrun));
            output::print_detail("Runtime", &format_opt_time(record.runtime));

            println!();
            let payload =
                serde_json::to_string_pretty(&detail.payload).expect("serialize payload");
            output::print_detail("Payload", "");
            println!("{}", payload);
        }
        _ => output::print_item(&detail, format),
    }

    Ok(())
}
