//! Queue inspection and lifecycle management.
//!
//! This module provides the operator-facing queue domain:
//!
//! - **Records**: job records, statuses, and the three table partitions
//! - **Statistics**: per-status counts with exact totals
//! - **Listing/Inspection**: filtered, bounded queries over the tables
//! - **Retry**: atomic re-admission of failed jobs into the active table
//! - **Purge**: criteria-scoped deletion with a dry-run preview
//! - **Monitor**: a cancellable cooperative polling loop

pub mod job;
pub mod monitor;
pub mod purge;
pub mod query;
pub mod retry;
pub mod stats;

pub use job::{JobRecord, JobStatus, JobSummary, NewJob, QueueTable};
pub use monitor::{Monitor, MonitorConfig, Tick, MIN_INTERVAL};
pub use purge::{PurgeController, PurgeCriteria, PurgeSummary, TablePurge};
pub use query::{inspect, list, JobDetail, ListRequest};
pub use retry::{RetriedJob, RetryController, RetryPreview, RetrySummary, DEFAULT_RETRY_LIMIT};
pub use stats::{format_delta, QueueStats, StatsDelta};
