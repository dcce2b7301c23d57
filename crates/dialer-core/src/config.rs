use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DialerError, Result};
use crate::model::ContactField;

/// Dialer engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Allocation (pick next) configuration
    pub allocation: AllocationConfig,

    /// Lock manager configuration
    pub locks: LockConfig,

    /// Import pipeline configuration
    pub import: ImportConfig,

    /// Logging configuration
    pub logging: LogSettings,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, `sqlite::memory:` for an in-memory store
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// How long a writer waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,
}

/// Allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Number of pending candidates read per page while looking for an
    /// eligible contact
    pub candidate_batch_size: u32,
}

/// Lock manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Locks older than this are resolved by the stale lock sweep (seconds)
    pub stale_after_secs: u64,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Largest accepted batch
    pub max_batch_size: usize,

    /// Dedup key used when the caller does not name one
    pub default_dedup_fields: Vec<ContactField>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default level directive (overridden by `RUST_LOG`)
    pub level: String,

    /// Emit JSON lines instead of the human formatter
    pub json: bool,
}

impl DialerConfig {
    /// Load configuration from an optional file layered under `DIALER__*`
    /// environment variables (`DIALER__DATABASE__URL=...`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: DialerConfig = builder
            .add_source(config::Environment::with_prefix("DIALER").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(DialerError::config("database.url cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(DialerError::config("database.max_connections must be greater than 0"));
        }

        if self.allocation.candidate_batch_size == 0 {
            return Err(DialerError::config("allocation.candidate_batch_size must be greater than 0"));
        }

        if self.locks.stale_after_secs == 0 {
            return Err(DialerError::config("locks.stale_after_secs must be greater than 0"));
        }

        if self.import.max_batch_size == 0 {
            return Err(DialerError::config("import.max_batch_size must be greater than 0"));
        }

        if self.import.default_dedup_fields.is_empty() {
            return Err(DialerError::config("import.default_dedup_fields cannot be empty"));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl LockConfig {
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs as i64)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dialer.db?mode=rwc".to_string(),
            max_connections: 10,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            candidate_batch_size: 200,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 4 * 3600, // a full shift
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 50_000,
            default_dedup_fields: vec![ContactField::PhoneNumber],
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DialerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = DialerConfig::default();
        config.allocation.candidate_batch_size = 0;
        assert!(matches!(config.validate(), Err(DialerError::Config(_))));
    }

    #[test]
    fn test_load_from_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[database]\nurl = \"sqlite::memory:\"\n\n[allocation]\ncandidate_batch_size = 25").unwrap();

        let config = DialerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(config.database.is_in_memory());
        assert_eq!(config.allocation.candidate_batch_size, 25);
        assert_eq!(config.locks.stale_after_secs, LockConfig::default().stale_after_secs);
        assert_eq!(config.import.default_dedup_fields, vec![ContactField::PhoneNumber]);
    }
}
