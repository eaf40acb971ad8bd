//! Filtered job listing and single-record inspection.

use serde::Serialize;

use crate::db::{JobStore, TABLE_LIST_CAP};
use crate::error::{QueueError, Result};
use crate::jobs::{JobRecord, JobStatus, JobSummary, QueueTable};

/// Parameters for a filtered listing.
///
/// A status filter narrows the query to the single table holding that
/// status; without one, all three tables are queried. When the listing spans
/// tables, results are concatenated per table in `QueueTable::ALL` order,
/// each chunk newest first; they are not globally re-sorted. Known
/// limitation.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Only jobs with this status
    pub status: Option<JobStatus>,
    /// Only jobs whose class matches exactly
    pub class: Option<String>,
    /// Rows returned per table, bounded by [`TABLE_LIST_CAP`]
    pub per_table_limit: i64,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            status: None,
            class: None,
            per_table_limit: TABLE_LIST_CAP,
        }
    }
}

impl ListRequest {
    /// Restrict to one status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to one handler class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Override the per-table row cap.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.per_table_limit = limit;
        self
    }
}

/// List job summaries across the tables selected by the status filter.
pub async fn list(store: &JobStore, request: &ListRequest) -> Result<Vec<JobSummary>> {
    if request.per_table_limit < 1 {
        return Err(QueueError::invalid("limit must be at least 1"));
    }
    let limit = request.per_table_limit.min(TABLE_LIST_CAP);
    let class = request.class.as_deref();

    match request.status {
        Some(status) => {
            store
                .list_table(status.table(), Some(status), class, limit)
                .await
        }
        None => {
            let mut jobs = Vec::new();
            for table in QueueTable::ALL {
                jobs.extend(store.list_table(table, None, class, limit).await?);
            }
            Ok(jobs)
        }
    }
}

/// A full record plus its decoded payload.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    /// The stored record
    #[serde(flatten)]
    pub record: JobRecord,
    /// `args` decoded as JSON, or the raw string when not valid JSON
    pub payload: serde_json::Value,
}

/// Fetch one full record from a caller-specified table.
pub async fn inspect(store: &JobStore, table: QueueTable, id: i64) -> Result<JobDetail> {
    let record = store
        .fetch(table, id)
        .await?
        .ok_or_else(|| QueueError::not_found(id, store.table_name(table)))?;

    let payload = record.decoded_args();
    Ok(JobDetail { record, payload })
}
