//! Command implementations.

pub mod clear;
pub mod config;
pub mod inspect;
pub mod retry;
pub mod status;
pub mod watch;

use chrono::{DateTime, Utc};

/// Render a timestamp for table cells.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render an optional timestamp, showing `-` when absent.
pub fn format_opt_time(time: Option<DateTime<Utc>>) -> String {
    time.map(format_time).unwrap_or_else(|| "-".to_string())
}
