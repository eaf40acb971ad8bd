//! Output formatting utilities for the jobq CLI.
//!
//! Supports table, CSV, and JSON output formats.

use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Render as a formatted table
    #[default]
    Table,
    /// Render as comma-separated values
    Csv,
    /// Render as JSON
    Json,
}

/// Print a success message to stdout.
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Print an informational message to stdout.
pub fn print_info(msg: &str) {
    println!("{} {}", "[INFO]".blue().bold(), msg);
}

/// Print a list of items in the requested format.
///
/// For table output, items must implement `Tabled`. For CSV/JSON, items must
/// implement `Serialize`.
pub fn print_list<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No results found.".dimmed());
                return;
            }
            let table = Table::new(items)
                .with(Style::rounded())
                .with(Modify::new(Columns::first()).with(Alignment::left()))
                .to_string();
            println!("{}", table);
        }
        OutputFormat::Csv => {
            print!("{}", to_csv(items));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).expect("serialize to JSON");
            println!("{}", json);
        }
    }
}

/// Print a single item in the requested format.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).expect("serialize to JSON");
            println!("{}", json);
        }
        OutputFormat::Csv => {
            print!("{}", to_csv(std::slice::from_ref(item)));
        }
    }
}

/// Print key-value details to the terminal (table output only).
pub fn print_detail(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().underline());
    println!();
}

/// Render items as CSV, one row per item, using their serialized field order
/// as the column order.
fn to_csv<T: Serialize>(items: &[T]) -> String {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = items
        .iter()
        .map(|item| {
            match serde_json::to_value(item).expect("serialize to JSON") {
                serde_json::Value::Object(map) => map,
                other => {
                    let mut map = serde_json::Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            }
        })
        .collect();

    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns: Vec<String> = first.keys().cloned().collect();

    let mut output = columns.join(",") + "\n";
    for row in &rows {
        let values: Vec<String> = columns
            .iter()
            .map(|column| row.get(column).map(csv_value).unwrap_or_default())
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }
    output
}

/// Format a JSON value for a CSV cell, quoting when it contains commas,
/// quotes, or newlines.
fn csv_value(value: &serde_json::Value) -> String {
    let s = match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escaping() {
        assert_eq!(csv_value(&serde_json::json!("plain")), "plain");
        assert_eq!(
            csv_value(&serde_json::json!("hello, world")),
            "\"hello, world\""
        );
        assert_eq!(
            csv_value(&serde_json::json!(r#"say "hi""#)),
            r#""say ""hi""""#
        );
        assert_eq!(csv_value(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_csv_rows_follow_field_order() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
            class: String,
        }

        let rows = vec![
            Row {
                id: 1,
                class: "SyncJob".to_string(),
            },
            Row {
                id: 2,
                class: "EmailJob".to_string(),
            },
        ];
        assert_eq!(to_csv(&rows), "id,class\n1,SyncJob\n2,EmailJob\n");
    }
}
