//! Configuration management.

use serde::Deserialize;

use crate::telemetry::LoggingConfig;

/// Main configuration for the queue tooling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Queue table configuration
    #[serde(default)]
    pub queue: QueueSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// Common prefix of the three queue tables
    #[serde(default)]
    pub table_prefix: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
        }
    }
}

// Default value functions
fn default_database_url() -> String {
    "sqlite://jobq.db?mode=rwc".to_string()
}
fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from the environment (`JOBQ__…` variables).
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("JOBQ").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("JOBQ").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite://jobq.db?mode=rwc");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.queue.table_prefix, "");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[database]\nurl = \"sqlite://queue.db\"\n\n[queue]\ntable_prefix = \"wp_\""
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.url, "sqlite://queue.db");
        assert_eq!(config.queue.table_prefix, "wp_");
    }
}
