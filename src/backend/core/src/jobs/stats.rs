//! Queue statistics aggregation.

use serde::Serialize;

use crate::db::JobStore;
use crate::error::Result;
use crate::jobs::{JobStatus, QueueTable};

/// Counts of jobs per status across the queue tables.
///
/// `total` is always the exact sum of the four buckets. Collecting has no
/// side effects, and a missing table contributes zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Jobs waiting in the active table
    pub pending: u64,
    /// Jobs currently being executed
    pub working: u64,
    /// Jobs in the completed table
    pub completed: u64,
    /// Jobs in the failed table
    pub failed: u64,
    /// Sum of all buckets
    pub total: u64,
}

impl QueueStats {
    /// Aggregate current counts from the store.
    pub async fn collect(store: &JobStore) -> Result<Self> {
        let pending = store.count(QueueTable::Active, Some(JobStatus::Pending)).await? as u64;
        let working = store.count(QueueTable::Active, Some(JobStatus::Working)).await? as u64;
        let completed = store.count(QueueTable::Completed, None).await? as u64;
        let failed = store.count(QueueTable::Failed, None).await? as u64;

        Ok(Self {
            pending,
            working,
            completed,
            failed,
            total: pending + working + completed + failed,
        })
    }

    /// Field-by-field difference against an earlier snapshot.
    pub fn delta_from(&self, previous: &QueueStats) -> StatsDelta {
        StatsDelta {
            pending: self.pending as i64 - previous.pending as i64,
            working: self.working as i64 - previous.working as i64,
            completed: self.completed as i64 - previous.completed as i64,
            failed: self.failed as i64 - previous.failed as i64,
            total: self.total as i64 - previous.total as i64,
        }
    }
}

/// Signed per-field change between two statistics snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsDelta {
    /// Change in pending jobs
    pub pending: i64,
    /// Change in working jobs
    pub working: i64,
    /// Change in completed jobs
    pub completed: i64,
    /// Change in failed jobs
    pub failed: i64,
    /// Change in the total
    pub total: i64,
}

/// Render a per-field delta the way the monitor prints it: `+N` for growth,
/// `(N)` for shrinkage, empty for no change.
pub fn format_delta(delta: i64) -> String {
    match delta {
        0 => String::new(),
        d if d > 0 => format!("+{d}"),
        d => format!("({})", -d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_arithmetic() {
        let before = QueueStats {
            pending: 3,
            working: 1,
            completed: 10,
            failed: 2,
            total: 16,
        };
        let after = QueueStats {
            pending: 5,
            working: 0,
            completed: 12,
            failed: 2,
            total: 19,
        };

        let delta = after.delta_from(&before);
        assert_eq!(delta.pending, 2);
        assert_eq!(delta.working, -1);
        assert_eq!(delta.completed, 2);
        assert_eq!(delta.failed, 0);
        assert_eq!(delta.total, 3);
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(0), "");
        assert_eq!(format_delta(4), "+4");
        assert_eq!(format_delta(-3), "(3)");
    }
}
