#![forbid(unsafe_code)]
//! # jobq Core
//!
//! Inspection and lifecycle management for a three-table relational job
//! queue: an active table holding pending and working jobs, plus dedicated
//! completed and failed tables.
//!
//! ## Architecture
//!
//! - **Store**: [`db::JobStore`], the explicit handle every operation goes
//!   through; no process-wide connection singleton
//! - **Statistics**: [`jobs::QueueStats`], per-status counts with an exact
//!   total
//! - **Listing/Inspection**: [`jobs::list`] and [`jobs::inspect`], bounded
//!   and filter-scoped
//! - **Retry**: [`jobs::RetryController`], atomic re-admission of failed
//!   jobs
//! - **Purge**: [`jobs::PurgeController`], criteria-scoped deletion with a
//!   dry-run preview
//! - **Monitor**: [`jobs::Monitor`], a cancellable cooperative polling loop

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod telemetry;

pub use error::{QueueError, Result};
