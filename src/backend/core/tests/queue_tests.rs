//! Integration tests for queue inspection and lifecycle management.
//!
//! These tests run against an in-memory SQLite store and exercise the
//! statistics, listing, retry, purge, and monitor paths end to end.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::watch;

use jobq_core::db::JobStore;
use jobq_core::error::QueueError;
use jobq_core::jobs::{
    self, JobStatus, ListRequest, Monitor, MonitorConfig, NewJob, PurgeController, PurgeCriteria,
    QueueStats, QueueTable, RetryController,
};

// ============================================================================
// Test Utilities
// ============================================================================

async fn memory_store() -> JobStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    let store = JobStore::with_pool(pool, "test_");
    store.migrate().await.expect("create queue tables");
    store
}

async fn seed(store: &JobStore, job: NewJob) -> i64 {
    store
        .insert(job.status.table(), &job)
        .await
        .expect("seed job")
}

// ============================================================================
// Statistics
// ============================================================================

#[tokio::test]
async fn test_statistics_report_exact_totals() {
    let store = memory_store().await;

    seed(&store, NewJob::pending("SyncJob", "{}")).await;
    seed(&store, NewJob::pending("EmailJob", "{}")).await;
    seed(
        &store,
        NewJob::pending("SyncJob", "{}").with_status(JobStatus::Working),
    )
    .await;
    seed(&store, NewJob::complete("SyncJob", "{}")).await;
    seed(&store, NewJob::complete("EmailJob", "{}")).await;
    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.working, 1);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total, 6);
    assert_eq!(
        stats.total,
        stats.pending + stats.working + stats.completed + stats.failed
    );
}

#[tokio::test]
async fn test_statistics_tolerate_empty_queue() {
    let store = memory_store().await;

    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats, QueueStats::default());
}

// ============================================================================
// Listing & Inspection
// ============================================================================

#[tokio::test]
async fn test_list_filters_by_class_and_table() {
    let store = memory_store().await;
    let now = Utc::now();

    seed(
        &store,
        NewJob::failed("SyncJob", "{}", "timeout").with_created_at(now - Duration::hours(3)),
    )
    .await;
    seed(
        &store,
        NewJob::failed("SyncJob", "{}", "bad gateway").with_created_at(now - Duration::hours(1)),
    )
    .await;
    seed(&store, NewJob::failed("EmailJob", "{}", "bounced")).await;
    seed(&store, NewJob::pending("SyncJob", "{}")).await;

    let request = ListRequest::default()
        .with_status(JobStatus::Failed)
        .with_class("SyncJob");
    let listed = jobs::list(&store, &request).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|job| job.class == "SyncJob"));
    assert!(listed.iter().all(|job| job.status == JobStatus::Failed));
    // Newest first.
    assert!(listed[0].created_at > listed[1].created_at);
}

#[tokio::test]
async fn test_list_without_status_spans_all_tables() {
    let store = memory_store().await;

    seed(&store, NewJob::pending("SyncJob", "{}")).await;
    seed(&store, NewJob::complete("SyncJob", "{}")).await;
    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    let listed = jobs::list(&store, &ListRequest::default()).await.unwrap();
    assert_eq!(listed.len(), 3);

    let rejected = jobs::list(&store, &ListRequest::default().with_limit(0)).await;
    assert!(matches!(rejected, Err(QueueError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_inspect_decodes_payload() {
    let store = memory_store().await;

    let id = seed(
        &store,
        NewJob::failed("SyncJob", r#"{"user_id": 7}"#, "timeout"),
    )
    .await;

    let detail = jobs::inspect(&store, QueueTable::Failed, id).await.unwrap();
    assert_eq!(detail.record.class, "SyncJob");
    assert_eq!(detail.payload["user_id"], 7);

    let raw_id = seed(&store, NewJob::failed("SyncJob", "not-json", "timeout")).await;
    let detail = jobs::inspect(&store, QueueTable::Failed, raw_id)
        .await
        .unwrap();
    assert_eq!(detail.payload, serde_json::json!("not-json"));

    let missing = jobs::inspect(&store, QueueTable::Failed, 9999).await;
    assert!(matches!(missing, Err(QueueError::NotFound { .. })));
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retry_moves_job_and_resets_state() {
    let store = memory_store().await;
    let retry = RetryController::new(store.clone());

    let failed_id = seed(
        &store,
        NewJob::failed("SyncJob", r#"{"user_id": 7}"#, "timeout")
            .with_priority(5)
            .with_tries(3)
            .with_batch("batch-1"),
    )
    .await;

    let retried = retry.retry_job(failed_id, false).await.unwrap();
    assert_eq!(retried.old_id, failed_id);
    assert_eq!(retried.class, "SyncJob");
    assert_eq!(retried.reason.as_deref(), Some("timeout"));

    // The failed-table id is consumed.
    assert!(store
        .fetch(QueueTable::Failed, failed_id)
        .await
        .unwrap()
        .is_none());

    // Exactly one active row carries the original fields with tries reset.
    let new_id = retried.new_id.expect("live retry assigns a new id");
    let record = store
        .fetch(QueueTable::Active, new_id)
        .await
        .unwrap()
        .expect("re-admitted row");
    assert_eq!(record.class, "SyncJob");
    assert_eq!(record.status, JobStatus::Pending);
    assert_eq!(record.tries, 0);
    assert_eq!(record.priority, 5);
    assert_eq!(record.args, r#"{"user_id": 7}"#);
    assert_eq!(record.batch.as_deref(), Some("batch-1"));
    assert_eq!(record.reason, None);
    assert!(record.lastrun.is_some());
    assert!(record.runtime.is_some());

    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn test_retry_missing_job_leaves_tables_unchanged() {
    let store = memory_store().await;
    let retry = RetryController::new(store.clone());

    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;
    let before = QueueStats::collect(&store).await.unwrap();

    let result = retry.retry_job(9999, false).await;
    assert!(matches!(result, Err(QueueError::NotFound { .. })));

    let after = QueueStats::collect(&store).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_retry_dry_run_mutates_nothing() {
    let store = memory_store().await;
    let retry = RetryController::new(store.clone());

    let id = seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    let preview = retry.retry_job(id, true).await.unwrap();
    assert_eq!(preview.new_id, None);
    assert!(preview.dry_run);

    assert!(store.fetch(QueueTable::Failed, id).await.unwrap().is_some());
    assert_eq!(store.count(QueueTable::Active, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_retry_honors_class_and_limit() {
    let store = memory_store().await;
    let retry = RetryController::new(store.clone());
    let now = Utc::now();

    for hours in 1..=3 {
        seed(
            &store,
            NewJob::failed("SyncJob", "{}", "timeout")
                .with_created_at(now - Duration::hours(hours)),
        )
        .await;
    }
    seed(&store, NewJob::failed("EmailJob", "{}", "bounced")).await;

    // Dry run previews without mutating.
    let preview = retry.retry_matching(Some("SyncJob"), 10, true).await.unwrap();
    assert_eq!(preview.attempted, 3);
    assert_eq!(preview.preview.len(), 3);
    assert_eq!(store.count(QueueTable::Failed, None).await.unwrap(), 4);

    // Live run caps at the limit, newest first, and skips other classes.
    let summary = retry.retry_matching(Some("SyncJob"), 2, false).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.retried, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.errors.is_empty());

    assert_eq!(store.count(QueueTable::Active, None).await.unwrap(), 2);
    assert_eq!(store.count(QueueTable::Failed, None).await.unwrap(), 2);

    let rejected = retry.retry_matching(None, 0, false).await;
    assert!(matches!(rejected, Err(QueueError::InvalidArgument(_))));
}

// ============================================================================
// Purge
// ============================================================================

#[tokio::test]
async fn test_unscoped_clear_is_rejected() {
    let store = memory_store().await;
    let purge = PurgeController::new(store.clone());

    seed(&store, NewJob::pending("SyncJob", "{}")).await;
    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    let result = purge.clear(&PurgeCriteria::default(), false).await;
    assert!(matches!(result, Err(QueueError::InvalidArgument(_))));

    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats.total, 2);
}

#[tokio::test]
async fn test_clear_dry_run_count_matches_live_delete() {
    let store = memory_store().await;
    let purge = PurgeController::new(store.clone());

    for _ in 0..3 {
        seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;
    }
    seed(&store, NewJob::pending("SyncJob", "{}")).await;

    let criteria = PurgeCriteria {
        status: Some(JobStatus::Failed),
        ..Default::default()
    };

    let preview = purge.clear(&criteria, true).await.unwrap();
    assert_eq!(preview.total, 3);
    assert!(preview.dry_run);
    assert_eq!(store.count(QueueTable::Failed, None).await.unwrap(), 3);

    let live = purge.clear(&criteria, false).await.unwrap();
    assert_eq!(live.total, preview.total);
    assert!(!live.dry_run);

    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pending, 1);
}

#[tokio::test]
async fn test_clear_age_cutoff_deletes_only_old_jobs() {
    let store = memory_store().await;
    let purge = PurgeController::new(store.clone());
    let now = Utc::now();

    let old_id = seed(
        &store,
        NewJob::failed("SyncJob", "{}", "timeout").with_created_at(now - Duration::hours(30)),
    )
    .await;
    let recent_id = seed(
        &store,
        NewJob::failed("SyncJob", "{}", "timeout").with_created_at(now - Duration::hours(1)),
    )
    .await;

    let criteria = PurgeCriteria {
        class: Some("SyncJob".to_string()),
        older_than_hours: Some(24),
        ..Default::default()
    };
    let summary = purge.clear(&criteria, false).await.unwrap();
    assert_eq!(summary.total, 1);

    assert!(store
        .fetch(QueueTable::Failed, old_id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .fetch(QueueTable::Failed, recent_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_repeated_clear_reports_zero() {
    let store = memory_store().await;
    let purge = PurgeController::new(store.clone());

    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    let criteria = PurgeCriteria {
        status: Some(JobStatus::Failed),
        ..Default::default()
    };
    assert_eq!(purge.clear(&criteria, false).await.unwrap().total, 1);
    assert_eq!(purge.clear(&criteria, false).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_clear_status_scopes_within_active_table() {
    let store = memory_store().await;
    let purge = PurgeController::new(store.clone());

    seed(&store, NewJob::pending("SyncJob", "{}")).await;
    seed(
        &store,
        NewJob::pending("SyncJob", "{}").with_status(JobStatus::Working),
    )
    .await;

    let criteria = PurgeCriteria {
        status: Some(JobStatus::Pending),
        ..Default::default()
    };
    let summary = purge.clear(&criteria, false).await.unwrap();
    assert_eq!(summary.total, 1);

    // The working job survives a pending-scoped purge.
    let stats = QueueStats::collect(&store).await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.working, 1);
}

// ============================================================================
// Monitor
// ============================================================================

#[tokio::test]
async fn test_monitor_emits_bounded_ticks() {
    let store = memory_store().await;

    seed(&store, NewJob::pending("SyncJob", "{}")).await;
    seed(&store, NewJob::failed("SyncJob", "{}", "timeout")).await;

    // Pause time only after the SQLite pool has connected: under a clock
    // paused from the start, auto-advance races the pool's blocking connect
    // thread to the acquire timeout and fails with PoolTimedOut.
    tokio::time::pause();

    let config = MonitorConfig::new(StdDuration::from_secs(1)).unwrap();
    let monitor = Monitor::new(store.clone(), config);

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut ticks = Vec::new();
    monitor
        .run(stop_rx, |tick| {
            ticks.push(tick);
            if ticks.len() == 3 {
                let _ = stop_tx.send(true);
            }
        })
        .await
        .unwrap();

    assert_eq!(ticks.len(), 3);
    assert!(ticks[0].delta.is_none());
    // Nothing changed between ticks, so later deltas are all zero.
    assert_eq!(ticks[1].delta.unwrap().total, 0);
    assert_eq!(ticks[0].stats.pending, 1);
    assert_eq!(ticks[0].stats.failed, 1);
    // Only the active job is listed, and nothing overflows the cap.
    assert_eq!(ticks[0].jobs.len(), 1);
    assert_eq!(ticks[0].more, 0);
}

#[tokio::test]
async fn test_monitor_changes_only_skips_unchanged_ticks() {
    let store = memory_store().await;

    seed(&store, NewJob::pending("SyncJob", "{}")).await;

    // Pause time only after the SQLite pool has connected: under a clock
    // paused from the start, auto-advance races the pool's blocking connect
    // thread to the acquire timeout and fails with PoolTimedOut.
    tokio::time::pause();

    let config = MonitorConfig::new(StdDuration::from_secs(1))
        .unwrap()
        .with_changes_only(true);
    let monitor = Monitor::new(store.clone(), config);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(4500)).await;
        let _ = stop_tx.send(true);
    });

    let mut ticks = Vec::new();
    monitor
        .run(stop_rx, |tick| ticks.push(tick))
        .await
        .unwrap();

    // The first observation always prints; identical follow-ups are skipped.
    assert_eq!(ticks.len(), 1);
}

#[tokio::test]
async fn test_monitor_rejects_sub_second_interval() {
    let result = MonitorConfig::new(StdDuration::from_millis(250));
    assert!(matches!(result, Err(QueueError::InvalidArgument(_))));
}
