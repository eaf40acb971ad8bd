//! Live monitoring loop over the queue.
//!
//! The monitor is a cooperative polling loop: compute statistics, emit a
//! tick, sleep, repeat. Ticks never overlap; the sleep is the only
//! suspension point, and the stop channel is honored there. A failed tick
//! query terminates the loop with the error rather than spinning.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::db::JobStore;
use crate::error::{QueueError, Result};
use crate::jobs::{JobStatus, JobSummary, QueueStats, QueueTable, StatsDelta};

/// Minimum polling interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// How many not-yet-finished jobs a tick lists.
const TICK_JOB_LIMIT: i64 = 10;

/// Configuration for the watch loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sleep between ticks
    pub interval: Duration,
    /// Only emit ticks whose statistics differ from the previous snapshot
    pub changes_only: bool,
    /// Restrict the per-tick job listing to this status
    pub status: Option<JobStatus>,
    /// Restrict the per-tick job listing to this class (exact match)
    pub class: Option<String>,
}

impl MonitorConfig {
    /// Build a configuration, rejecting sub-second intervals.
    pub fn new(interval: Duration) -> Result<Self> {
        if interval < MIN_INTERVAL {
            return Err(QueueError::invalid(
                "watch interval must be at least 1 second",
            ));
        }
        Ok(Self {
            interval,
            changes_only: false,
            status: None,
            class: None,
        })
    }

    /// Only emit ticks whose statistics changed.
    pub fn with_changes_only(mut self, changes_only: bool) -> Self {
        self.changes_only = changes_only;
        self
    }

    /// Restrict the job listing to one status.
    pub fn with_status(mut self, status: Option<JobStatus>) -> Self {
        self.status = status;
        self
    }

    /// Restrict the job listing to one class.
    pub fn with_class(mut self, class: Option<String>) -> Self {
        self.class = class;
        self
    }
}

/// One observation of the queue.
#[derive(Debug, Clone, Serialize)]
pub struct Tick {
    /// Current statistics
    pub stats: QueueStats,
    /// Change against the previous snapshot; absent on the first tick
    pub delta: Option<StatsDelta>,
    /// Up to ten not-yet-finished jobs matching the filters
    pub jobs: Vec<JobSummary>,
    /// Matching jobs beyond the listed ones
    pub more: u64,
}

/// Cooperative polling monitor.
pub struct Monitor {
    store: JobStore,
    config: MonitorConfig,
}

impl Monitor {
    /// Create a monitor over the given store.
    pub fn new(store: JobStore, config: MonitorConfig) -> Self {
        Self { store, config }
    }

    /// Run until the stop channel observes `true`.
    ///
    /// Each iteration recomputes statistics; with `changes_only`, ticks whose
    /// statistics equal the previous snapshot are skipped. The previous
    /// snapshot still advances on skipped ticks, so deltas always compare
    /// consecutive observations.
    pub async fn run<F>(&self, mut stop: watch::Receiver<bool>, mut emit: F) -> Result<()>
    where
        F: FnMut(Tick),
    {
        debug!(interval = ?self.config.interval, "monitor started");
        let mut previous: Option<QueueStats> = None;

        loop {
            let stats = QueueStats::collect(&self.store).await?;
            let changed = previous.map_or(true, |snapshot| snapshot != stats);

            if changed || !self.config.changes_only {
                let (jobs, more) = self.active_jobs().await?;
                emit(Tick {
                    stats,
                    delta: previous.map(|snapshot| stats.delta_from(&snapshot)),
                    jobs,
                    more,
                });
            }
            previous = Some(stats);

            tokio::select! {
                changed = stop.changed() => {
                    // A dropped sender means nobody can stop us anymore;
                    // treat it the same as an explicit stop.
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        debug!("monitor stopped");
        Ok(())
    }

    /// The pending/working jobs a printed tick lists, plus how many more
    /// exist beyond the cap.
    async fn active_jobs(&self) -> Result<(Vec<JobSummary>, u64)> {
        // A status filter naming a finished status cannot intersect the
        // active table.
        let status = match self.config.status {
            Some(status) if !status.is_active() => return Ok((Vec::new(), 0)),
            status => status,
        };
        let class = self.config.class.as_deref();

        let jobs = self
            .store
            .list_table(QueueTable::Active, status, class, TICK_JOB_LIMIT)
            .await?;
        let matching = self
            .store
            .count_matching(QueueTable::Active, status, class, None)
            .await? as u64;
        let more = matching.saturating_sub(jobs.len() as u64);

        Ok((jobs, more))
    }
}
