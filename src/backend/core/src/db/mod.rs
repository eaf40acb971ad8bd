//! Storage layer for the job queue.
//!
//! Uses SQLite for persistent storage with sqlx. Three tables share a
//! configurable prefix: active (`<prefix>jobs`), completed
//! (`<prefix>completed_jobs`), and failed (`<prefix>failed_jobs`). A record
//! lives in exactly one of them at any time; moving between tables is a
//! delete-then-insert performed inside a single transaction.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::{QueueError, Result};
use crate::jobs::{JobRecord, JobStatus, JobSummary, NewJob, QueueTable};

/// Maximum rows returned per table by a single listing query.
pub const TABLE_LIST_CAP: i64 = 100;

/// Columns selected for full records.
const RECORD_COLUMNS: &str = "id, class, status, priority, tries, args, batch, reason, \
                              created_at, firstrun, lastrun, runtime";

/// Columns selected for listing summaries.
const SUMMARY_COLUMNS: &str = "id, class, status, priority, tries, created_at, runtime, lastrun";

/// Handle to the queue tables.
///
/// Constructed explicitly and passed into each controller; there is no
/// process-wide connection singleton. Cloning is cheap (the pool is shared).
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
    prefix: String,
}

/// Result of re-admitting a failed job into the active table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RequeuedJob {
    /// Identity assigned in the active table
    pub new_id: i64,
    /// The failed-table record that was consumed
    pub original: JobRecord,
}

impl JobStore {
    /// Open a connection pool against the given database URL.
    pub async fn connect(database_url: &str, prefix: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self::with_pool(pool, prefix))
    }

    /// Build a store around an existing pool.
    pub fn with_pool(pool: SqlitePool, prefix: &str) -> Self {
        Self {
            pool,
            prefix: prefix.to_string(),
        }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The configured table prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fully qualified name of a queue table.
    pub fn table_name(&self, table: QueueTable) -> String {
        table.name(&self.prefix)
    }

    /// Close the pool, releasing all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the queue tables if they do not exist.
    ///
    /// Table names carry a runtime-configured prefix, so the schema is issued
    /// as dynamic DDL rather than static migration files.
    pub async fn migrate(&self) -> Result<()> {
        for table in QueueTable::ALL {
            let ddl = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {name} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    class TEXT NOT NULL,
                    status TEXT NOT NULL,
                    priority INTEGER NOT NULL DEFAULT 0,
                    tries INTEGER NOT NULL DEFAULT 0,
                    args TEXT NOT NULL DEFAULT '',
                    batch TEXT,
                    reason TEXT,
                    created_at TEXT NOT NULL,
                    firstrun TEXT,
                    lastrun TEXT,
                    runtime TEXT
                )
                "#,
                name = self.table_name(table),
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Counting
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether a queue table exists in the database.
    pub async fn table_exists(&self, table: QueueTable) -> Result<bool> {
        let present: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(self.table_name(table))
        .fetch_optional(&self.pool)
        .await?;

        Ok(present.is_some())
    }

    /// Count rows in a table, optionally restricted to one status.
    ///
    /// A table that does not exist counts as zero, so statistics stay usable
    /// against a store that was never migrated.
    pub async fn count(&self, table: QueueTable, status: Option<JobStatus>) -> Result<i64> {
        if !self.table_exists(table).await? {
            return Ok(0);
        }

        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table_name(table));
        if status.is_some() {
            sql.push_str(" WHERE status = ?");
        }

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    /// Count rows in one table matching the conjunctive predicate
    /// `status AND class AND created_at < created_before`.
    pub async fn count_matching(
        &self,
        table: QueueTable,
        status: Option<JobStatus>,
        class: Option<&str>,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table_name(table));
        push_predicate(&mut sql, status, class, created_before);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        if let Some(class) = class {
            query = query.bind(class);
        }
        if let Some(created_before) = created_before {
            query = query.bind(created_before);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Listing & Fetching
    // ═══════════════════════════════════════════════════════════════════════════

    /// List jobs in one table, newest first by `created_at`, capped at
    /// `limit` rows.
    pub async fn list_table(
        &self,
        table: QueueTable,
        status: Option<JobStatus>,
        class: Option<&str>,
        limit: i64,
    ) -> Result<Vec<JobSummary>> {
        let mut sql = format!("SELECT {SUMMARY_COLUMNS} FROM {}", self.table_name(table));
        push_predicate(&mut sql, status, class, None);
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, JobSummary>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        if let Some(class) = class {
            query = query.bind(class);
        }

        Ok(query.bind(limit).fetch_all(&self.pool).await?)
    }

    /// Full failed-table records matching a class filter, newest first.
    pub async fn list_failed(&self, class: Option<&str>, limit: i64) -> Result<Vec<JobRecord>> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {}",
            self.table_name(QueueTable::Failed)
        );
        push_predicate(&mut sql, None, class, None);
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, JobRecord>(&sql);
        if let Some(class) = class {
            query = query.bind(class);
        }

        Ok(query.bind(limit).fetch_all(&self.pool).await?)
    }

    /// Fetch a full record by id from a specific table.
    pub async fn fetch(&self, table: QueueTable, id: i64) -> Result<Option<JobRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE id = ?",
            self.table_name(table)
        );

        Ok(sqlx::query_as::<_, JobRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════════════

    /// Insert a record into a queue partition, returning its id.
    ///
    /// The record's status must belong to the target partition; the invariant
    /// that a job exists in exactly one table depends on it.
    pub async fn insert(&self, table: QueueTable, job: &NewJob) -> Result<i64> {
        if job.status.table() != table {
            return Err(QueueError::invalid(format!(
                "status '{}' does not belong in table '{}'",
                job.status, table
            )));
        }

        let sql = format!(
            "INSERT INTO {} (class, status, priority, tries, args, batch, reason, \
             created_at, firstrun, lastrun, runtime) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table_name(table)
        );

        let result = sqlx::query(&sql)
            .bind(&job.class)
            .bind(job.status)
            .bind(job.priority)
            .bind(job.tries)
            .bind(&job.args)
            .bind(job.batch.as_deref())
            .bind(job.reason.as_deref())
            .bind(job.created_at)
            .bind(job.firstrun)
            .bind(job.lastrun)
            .bind(job.runtime)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Delete rows in one table matching the conjunctive predicate, returning
    /// how many were removed. Absent rows are a no-op.
    pub async fn delete_matching(
        &self,
        table: QueueTable,
        status: Option<JobStatus>,
        class: Option<&str>,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let mut sql = format!("DELETE FROM {}", self.table_name(table));
        push_predicate(&mut sql, status, class, created_before);

        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        if let Some(class) = class {
            query = query.bind(class);
        }
        if let Some(created_before) = created_before {
            query = query.bind(created_before);
        }
        let result = query.execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    /// Atomically move a failed job back into the active table.
    ///
    /// The re-admitted row starts pending with `tries` reset to 0, `lastrun`
    /// and `runtime` refreshed to now, `reason` cleared, and `priority`,
    /// `class`, `batch`, `args` preserved. Insert and delete run in one
    /// transaction, so a crash between the steps can neither duplicate nor
    /// lose the job. The failed-table id is consumed; the active table
    /// assigns a fresh identity.
    pub async fn requeue_failed(&self, id: i64) -> Result<RequeuedJob> {
        let failed = self.table_name(QueueTable::Failed);
        let active = self.table_name(QueueTable::Active);

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {RECORD_COLUMNS} FROM {failed} WHERE id = ?");
        let original = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| QueueError::not_found(id, &failed))?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {active} (class, status, priority, tries, args, batch, reason, \
             created_at, firstrun, lastrun, runtime) \
             VALUES (?, ?, ?, 0, ?, ?, NULL, ?, ?, ?, ?)"
        );
        let result = sqlx::query(&sql)
            .bind(&original.class)
            .bind(JobStatus::Pending)
            .bind(original.priority)
            .bind(&original.args)
            .bind(original.batch.as_deref())
            .bind(now)
            .bind(original.firstrun)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        let new_id = result.last_insert_rowid();

        let sql = format!("DELETE FROM {failed} WHERE id = ?");
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;

        tx.commit().await?;

        debug!(job.id = id, job.new_id = new_id, job.class = %original.class, "failed job re-admitted");
        Ok(RequeuedJob {
            new_id,
            original,
        })
    }
}

/// Append a `WHERE` clause for the conjunctive status/class/age predicate.
fn push_predicate(
    sql: &mut String,
    status: Option<JobStatus>,
    class: Option<&str>,
    created_before: Option<DateTime<Utc>>,
) {
    let mut clauses = Vec::new();
    if status.is_some() {
        clauses.push("status = ?");
    }
    if class.is_some() {
        clauses.push("class = ?");
    }
    if created_before.is_some() {
        clauses.push("created_at < ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> JobStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory database");
        JobStore::with_pool(pool, "test_")
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = memory_store().await;
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();

        for table in QueueTable::ALL {
            assert!(store.table_exists(table).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_missing_table_counts_as_zero() {
        let store = memory_store().await;

        assert!(!store.table_exists(QueueTable::Active).await.unwrap());
        assert_eq!(store.count(QueueTable::Active, None).await.unwrap(), 0);
        assert_eq!(store.count(QueueTable::Failed, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_mismatched_partition() {
        let store = memory_store().await;
        store.migrate().await.unwrap();

        let job = NewJob::pending("SyncJob", "{}");
        let error = store.insert(QueueTable::Failed, &job).await.unwrap_err();
        assert!(matches!(error, QueueError::InvalidArgument(_)));
        assert_eq!(store.count(QueueTable::Failed, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_fetch_round_trip() {
        let store = memory_store().await;
        store.migrate().await.unwrap();

        let job = NewJob::failed("SyncJob", r#"{"user_id":7}"#, "timeout")
            .with_priority(3)
            .with_batch("batch-1");
        let id = store.insert(QueueTable::Failed, &job).await.unwrap();

        let record = store.fetch(QueueTable::Failed, id).await.unwrap().unwrap();
        assert_eq!(record.class, "SyncJob");
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.priority, 3);
        assert_eq!(record.batch.as_deref(), Some("batch-1"));
        assert_eq!(record.reason.as_deref(), Some("timeout"));

        assert!(store.fetch(QueueTable::Active, id).await.unwrap().is_none());
    }
}
