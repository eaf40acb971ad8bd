//! Job records and queue partitions.
//!
//! A job's status is an explicit column value; which physical table a record
//! lives in is a partitioning detail derived from it. The active table holds
//! pending and working jobs, while completed and failed jobs each get a
//! dedicated table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueueError;

// ═══════════════════════════════════════════════════════════════════════════════
// Job Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the active table for a worker to pick it up
    Pending,
    /// Currently being executed
    Working,
    /// Finished successfully
    Complete,
    /// Execution exhausted its attempts or errored
    Failed,
}

impl JobStatus {
    /// String form stored in the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Working => "working",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// The table partition a job with this status lives in.
    pub fn table(&self) -> QueueTable {
        match self {
            Self::Pending | Self::Working => QueueTable::Active,
            Self::Complete => QueueTable::Completed,
            Self::Failed => QueueTable::Failed,
        }
    }

    /// Whether the job has not yet finished.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Working)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "working" => Ok(Self::Working),
            "complete" | "completed" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(QueueError::invalid(format!(
                "unknown status '{other}' (expected pending, working, complete, or failed)"
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Queue Tables
// ═══════════════════════════════════════════════════════════════════════════════

/// The three physical partitions of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTable {
    /// Not-yet-finished jobs (pending or working)
    Active,
    /// Successfully finished jobs
    Completed,
    /// Jobs whose execution exhausted its attempts or errored
    Failed,
}

impl QueueTable {
    /// All partitions, in the order multi-table listings concatenate them.
    pub const ALL: [QueueTable; 3] = [Self::Active, Self::Completed, Self::Failed];

    /// Table name under the given prefix.
    pub fn name(&self, prefix: &str) -> String {
        match self {
            Self::Active => format!("{prefix}jobs"),
            Self::Completed => format!("{prefix}completed_jobs"),
            Self::Failed => format!("{prefix}failed_jobs"),
        }
    }

    /// Statuses whose records live in this partition.
    pub fn statuses(&self) -> &'static [JobStatus] {
        match self {
            Self::Active => &[JobStatus::Pending, JobStatus::Working],
            Self::Completed => &[JobStatus::Complete],
            Self::Failed => &[JobStatus::Failed],
        }
    }

    /// Short operator-facing label, as accepted by `--table`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "jobs",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueTable {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jobs" | "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(QueueError::invalid(format!(
                "unknown table '{other}' (expected jobs, completed, or failed)"
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════════

/// A full job record as stored in one of the queue tables.
///
/// Ids are unique within their table but not stable across tables: retrying
/// a failed job consumes its failed-table id and assigns a fresh one in the
/// active table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobRecord {
    /// Identifier within the record's table
    pub id: i64,
    /// Name of the work handler this job is dispatched to
    pub class: String,
    /// Current status (also determines the table partition)
    pub status: JobStatus,
    /// Producer-defined execution ordering
    pub priority: i64,
    /// Execution attempts so far
    pub tries: i64,
    /// Opaque serialized payload, normally JSON
    pub args: String,
    /// Grouping identifier for jobs issued together
    pub batch: Option<String>,
    /// Failure explanation, populated only on failed jobs
    pub reason: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job first started executing
    pub firstrun: Option<DateTime<Utc>>,
    /// When the job last started executing
    pub lastrun: Option<DateTime<Utc>>,
    /// Clock of the most recent execution
    pub runtime: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// The payload decoded as JSON; content that is not valid JSON is
    /// surfaced as a raw string.
    pub fn decoded_args(&self) -> serde_json::Value {
        serde_json::from_str(&self.args)
            .unwrap_or_else(|_| serde_json::Value::String(self.args.clone()))
    }
}

/// The listing projection of a job.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobSummary {
    /// Identifier within the record's table
    pub id: i64,
    /// Name of the work handler
    pub class: String,
    /// Current status
    pub status: JobStatus,
    /// Producer-defined execution ordering
    pub priority: i64,
    /// Execution attempts so far
    pub tries: i64,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// Clock of the most recent execution
    pub runtime: Option<DateTime<Utc>>,
    /// When the job last started executing
    pub lastrun: Option<DateTime<Utc>>,
}

/// A record to insert into a queue partition.
///
/// Producers enqueue through this shape; the test suite uses it to seed
/// fixtures. The status must belong to the partition the record is inserted
/// into.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Name of the work handler
    pub class: String,
    /// Status, which must match the target partition
    pub status: JobStatus,
    /// Producer-defined execution ordering
    pub priority: i64,
    /// Execution attempts so far
    pub tries: i64,
    /// Opaque serialized payload
    pub args: String,
    /// Grouping identifier
    pub batch: Option<String>,
    /// Failure explanation
    pub reason: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// First execution start
    pub firstrun: Option<DateTime<Utc>>,
    /// Most recent execution start
    pub lastrun: Option<DateTime<Utc>>,
    /// Most recent execution clock
    pub runtime: Option<DateTime<Utc>>,
}

impl NewJob {
    /// A pending job with the given class and payload, created now.
    pub fn pending(class: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            status: JobStatus::Pending,
            priority: 0,
            tries: 0,
            args: args.into(),
            batch: None,
            reason: None,
            created_at: Utc::now(),
            firstrun: None,
            lastrun: None,
            runtime: None,
        }
    }

    /// A completed job with the given class and payload.
    pub fn complete(class: impl Into<String>, args: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: JobStatus::Complete,
            firstrun: Some(now),
            lastrun: Some(now),
            runtime: Some(now),
            ..Self::pending(class, args)
        }
    }

    /// A failed job with the given class, payload, and failure reason.
    pub fn failed(
        class: impl Into<String>,
        args: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            status: JobStatus::Failed,
            tries: 1,
            reason: Some(reason.into()),
            firstrun: Some(now),
            lastrun: Some(now),
            runtime: Some(now),
            ..Self::pending(class, args)
        }
    }

    /// Override the status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Override the attempt count.
    pub fn with_tries(mut self, tries: i64) -> Self {
        self.tries = tries;
        self
    }

    /// Attach a batch identifier.
    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }

    /// Override the creation time (used for age-based scenarios).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Working,
            JobStatus::Complete,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::Complete);
        assert!("running".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_partitioning() {
        assert_eq!(JobStatus::Pending.table(), QueueTable::Active);
        assert_eq!(JobStatus::Working.table(), QueueTable::Active);
        assert_eq!(JobStatus::Complete.table(), QueueTable::Completed);
        assert_eq!(JobStatus::Failed.table(), QueueTable::Failed);
    }

    #[test]
    fn test_table_names_carry_prefix() {
        assert_eq!(QueueTable::Active.name("wp_"), "wp_jobs");
        assert_eq!(QueueTable::Completed.name("wp_"), "wp_completed_jobs");
        assert_eq!(QueueTable::Failed.name(""), "failed_jobs");
    }

    #[test]
    fn test_table_parse_accepts_aliases() {
        assert_eq!("jobs".parse::<QueueTable>().unwrap(), QueueTable::Active);
        assert_eq!("active".parse::<QueueTable>().unwrap(), QueueTable::Active);
        assert!("archive".parse::<QueueTable>().is_err());
    }

    #[test]
    fn test_decoded_args_falls_back_to_raw_string() {
        let mut record = sample_record();
        record.args = r#"{"user_id": 7}"#.to_string();
        assert_eq!(record.decoded_args()["user_id"], 7);

        record.args = "a:1:{s:3:\"key\";i:7;}".to_string();
        assert_eq!(
            record.decoded_args(),
            serde_json::Value::String(record.args.clone())
        );
    }

    fn sample_record() -> JobRecord {
        JobRecord {
            id: 1,
            class: "SyncJob".to_string(),
            status: JobStatus::Pending,
            priority: 0,
            tries: 0,
            args: String::new(),
            batch: None,
            reason: None,
            created_at: Utc::now(),
            firstrun: None,
            lastrun: None,
            runtime: None,
        }
    }
}
