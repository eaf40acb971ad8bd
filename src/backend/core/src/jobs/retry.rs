//! Re-admission of failed jobs into the active table.

use serde::Serialize;
use tracing::info;

use crate::db::JobStore;
use crate::error::{QueueError, Result};
use crate::jobs::QueueTable;

/// Default number of failed jobs a bulk retry touches.
pub const DEFAULT_RETRY_LIMIT: i64 = 10;

/// Maximum sampled error messages carried in a bulk summary.
const ERROR_SAMPLE_LIMIT: usize = 10;

/// Outcome of retrying a single failed job.
#[derive(Debug, Clone, Serialize)]
pub struct RetriedJob {
    /// The consumed failed-table id
    pub old_id: i64,
    /// Identity assigned in the active table; absent on a dry run
    pub new_id: Option<i64>,
    /// Handler class of the job
    pub class: String,
    /// Failure reason recorded before re-admission
    pub reason: Option<String>,
    /// True when nothing was mutated
    pub dry_run: bool,
}

/// Dry-run preview of one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct RetryPreview {
    /// Failed-table id
    pub id: i64,
    /// Handler class
    pub class: String,
    /// Recorded failure reason
    pub reason: Option<String>,
}

/// Aggregate outcome of a bulk retry pass.
///
/// A single job's failure to retry does not abort the batch; it is counted
/// and its error sampled here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrySummary {
    /// Jobs selected for retry
    pub attempted: u64,
    /// Jobs successfully re-admitted
    pub retried: u64,
    /// Jobs that could not be re-admitted
    pub failed: u64,
    /// Up to ten sampled error messages
    pub errors: Vec<String>,
    /// Errors beyond the sample cap
    pub errors_truncated: u64,
    /// Candidates that would be retried (dry runs only)
    pub preview: Vec<RetryPreview>,
    /// True when no table was mutated
    pub dry_run: bool,
}

/// Moves failed jobs back into the active table.
pub struct RetryController {
    store: JobStore,
}

impl RetryController {
    /// Create a controller over the given store.
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// Retry a single failed job by id.
    ///
    /// Fails with `NotFound` (mutating nothing) when the id is absent from
    /// the failed table.
    pub async fn retry_job(&self, id: i64, dry_run: bool) -> Result<RetriedJob> {
        if dry_run {
            let record = self
                .store
                .fetch(QueueTable::Failed, id)
                .await?
                .ok_or_else(|| {
                    QueueError::not_found(id, self.store.table_name(QueueTable::Failed))
                })?;

            return Ok(RetriedJob {
                old_id: id,
                new_id: None,
                class: record.class,
                reason: record.reason,
                dry_run: true,
            });
        }

        let requeued = self.store.requeue_failed(id).await?;
        info!(
            job.id = id,
            job.new_id = requeued.new_id,
            job.class = %requeued.original.class,
            "job retried"
        );

        Ok(RetriedJob {
            old_id: id,
            new_id: Some(requeued.new_id),
            class: requeued.original.class,
            reason: requeued.original.reason,
            dry_run: false,
        })
    }

    /// Retry failed jobs matching the class filter, newest first, capped at
    /// `limit`.
    pub async fn retry_matching(
        &self,
        class: Option<&str>,
        limit: i64,
        dry_run: bool,
    ) -> Result<RetrySummary> {
        if limit < 1 {
            return Err(QueueError::invalid("retry limit must be at least 1"));
        }

        let candidates = self.store.list_failed(class, limit).await?;

        let mut summary = RetrySummary {
            dry_run,
            ..RetrySummary::default()
        };

        for candidate in candidates {
            summary.attempted += 1;

            if dry_run {
                summary.preview.push(RetryPreview {
                    id: candidate.id,
                    class: candidate.class,
                    reason: candidate.reason,
                });
                continue;
            }

            match self.store.requeue_failed(candidate.id).await {
                Ok(_) => summary.retried += 1,
                Err(error) => {
                    summary.failed += 1;
                    if summary.errors.len() < ERROR_SAMPLE_LIMIT {
                        summary
                            .errors
                            .push(format!("job {}: {error}", candidate.id));
                    } else {
                        summary.errors_truncated += 1;
                    }
                }
            }
        }

        if !dry_run {
            info!(
                retried = summary.retried,
                failed = summary.failed,
                "bulk retry finished"
            );
        }
        Ok(summary)
    }
}
