//! Criteria-scoped permanent deletion.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::db::JobStore;
use crate::error::{QueueError, Result};
use crate::jobs::{JobStatus, QueueTable};

/// Filter for a purge operation.
///
/// At least one criterion must be present; an unscoped purge is rejected
/// before any table is touched. The criteria combine conjunctively:
/// `status AND class AND created_at < now - older_than_hours`.
#[derive(Debug, Clone, Default)]
pub struct PurgeCriteria {
    /// Only jobs with this status
    pub status: Option<JobStatus>,
    /// Only jobs whose class matches exactly
    pub class: Option<String>,
    /// Only jobs created more than this many hours ago
    pub older_than_hours: Option<u64>,
}

impl PurgeCriteria {
    /// Whether at least one criterion is present.
    pub fn is_scoped(&self) -> bool {
        self.status.is_some() || self.class.is_some() || self.older_than_hours.is_some()
    }

    /// Tables the criteria select, mirroring the listing's status-aware
    /// table selection.
    pub fn tables(&self) -> Vec<QueueTable> {
        match self.status {
            Some(status) => vec![status.table()],
            None => QueueTable::ALL.to_vec(),
        }
    }

    /// The creation-time cutoff implied by `older_than_hours`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.older_than_hours
            .map(|hours| now - Duration::hours(hours as i64))
    }
}

/// Matched (or deleted) rows for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TablePurge {
    /// The table partition
    pub table: QueueTable,
    /// Rows deleted, or rows that would be deleted on a dry run
    pub matched: u64,
}

/// Per-table and total deletion counts.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeSummary {
    /// Counts per candidate table
    pub tables: Vec<TablePurge>,
    /// Total across tables
    pub total: u64,
    /// True when no table was mutated
    pub dry_run: bool,
}

/// Deletes jobs matching explicit criteria.
pub struct PurgeController {
    store: JobStore,
}

impl PurgeController {
    /// Create a controller over the given store.
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// Delete (or, on a dry run, count) jobs matching the criteria.
    ///
    /// Purging rows that are already gone is a no-op, so repeating a purge
    /// with identical criteria reports zero.
    pub async fn clear(&self, criteria: &PurgeCriteria, dry_run: bool) -> Result<PurgeSummary> {
        if !criteria.is_scoped() {
            return Err(QueueError::invalid(
                "clear requires at least one of --status, --class, or --older-than",
            ));
        }

        let cutoff = criteria.cutoff(Utc::now());
        let class = criteria.class.as_deref();

        let mut tables = Vec::new();
        let mut total = 0;
        for table in criteria.tables() {
            let matched = if dry_run {
                self.store
                    .count_matching(table, criteria.status, class, cutoff)
                    .await? as u64
            } else {
                self.store
                    .delete_matching(table, criteria.status, class, cutoff)
                    .await?
            };
            total += matched;
            tables.push(TablePurge { table, matched });
        }

        if !dry_run {
            info!(total, "jobs purged");
        }
        Ok(PurgeSummary {
            tables,
            total,
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_criteria_detected() {
        assert!(!PurgeCriteria::default().is_scoped());
        assert!(PurgeCriteria {
            class: Some("SyncJob".to_string()),
            ..Default::default()
        }
        .is_scoped());
        assert!(PurgeCriteria {
            older_than_hours: Some(24),
            ..Default::default()
        }
        .is_scoped());
    }

    #[test]
    fn test_status_narrows_candidate_tables() {
        let unscoped = PurgeCriteria {
            older_than_hours: Some(1),
            ..Default::default()
        };
        assert_eq!(unscoped.tables(), QueueTable::ALL.to_vec());

        let failed_only = PurgeCriteria {
            status: Some(JobStatus::Failed),
            ..Default::default()
        };
        assert_eq!(failed_only.tables(), vec![QueueTable::Failed]);

        let pending_only = PurgeCriteria {
            status: Some(JobStatus::Pending),
            ..Default::default()
        };
        assert_eq!(pending_only.tables(), vec![QueueTable::Active]);
    }

    #[test]
    fn test_cutoff_subtracts_hours() {
        let now = Utc::now();
        let criteria = PurgeCriteria {
            older_than_hours: Some(24),
            ..Default::default()
        };
        assert_eq!(criteria.cutoff(now), Some(now - Duration::hours(24)));
        assert_eq!(PurgeCriteria::default().cutoff(now), None);
    }
}
