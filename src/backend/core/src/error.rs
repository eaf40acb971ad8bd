//! Error handling for queue operations.
//!
//! The taxonomy follows how operators experience failures:
//!
//! - `NotFound`: a referenced job id is absent from the expected table
//! - `InvalidArgument`: a request rejected before any mutation (unscoped
//!   purge, malformed interval or limit)
//! - `Store`: the underlying database is unavailable or a query failed;
//!   fatal for the invoked command, never retried internally
//! - `Serialization`: a job payload could not be encoded or decoded
//!
//! Partial failure in bulk operations is not an error: bulk retry and purge
//! continue past individual rows and report aggregate counts instead (see
//! `jobs::retry::RetrySummary` and `jobs::purge::PurgeSummary`).

use thiserror::Error;

/// A specialized Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors produced by queue inspection and lifecycle operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Referenced job id absent from the expected table.
    #[error("job {id} not found in table '{table}'")]
    NotFound {
        /// The id that was looked up
        id: i64,
        /// The table that was searched
        table: String,
    },

    /// The request was rejected before any mutation was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store is inaccessible or a query failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A job payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    /// Construct a `NotFound` error for a job id in a table.
    pub fn not_found(id: i64, table: impl Into<String>) -> Self {
        Self::NotFound {
            id,
            table: table.into(),
        }
    }

    /// Construct an `InvalidArgument` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the error indicates the store itself is unavailable.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
