//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `unistore.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use unistore_adapter_storage_sqlite_sqlx::{Dialect, IsolationLevel};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// SQL dialect and transaction settings.
    pub storage: StorageConfig,
    /// Watch poller settings.
    pub watch: WatchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Service-layer settings.
    pub service: ServiceConfig,
}

/// Database connection configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Upper bound of pooled connections.
    pub max_connections: u32,
}

/// Storage engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `sqlite`, `postgres` or `mysql`. Only `sqlite` can be opened.
    pub dialect: String,
    /// `read-committed`, `repeatable-read` or `serializable`.
    pub isolation: String,
}

/// Watch poller configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_ms: u64,
    /// Capacity of the watch broadcast channel.
    pub buffer_size: usize,
    /// Rows fetched per history query.
    pub batch_size: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Service-layer configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-call deadline; `0` or absent disables it.
    pub request_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from `unistore.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("unistore.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("UNISTORE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(interval) = var("UNISTORE_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.watch.poll_interval_ms = interval;
        }
        if let Some(val) = var("UNISTORE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.watch.buffer_size == 0 {
            return Err(ConfigError::Validation(
                "watch.buffer_size must be non-zero".to_string(),
            ));
        }
        if self.watch.batch_size == 0 {
            return Err(ConfigError::Validation(
                "watch.batch_size must be non-zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be non-zero".to_string(),
            ));
        }
        match self.dialect()? {
            Dialect::Sqlite => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "storage.dialect {other} has no engine in this build"
                )));
            }
        }
        self.isolation()?;
        Ok(())
    }

    /// The configured SQL dialect.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown dialect name.
    pub fn dialect(&self) -> Result<Dialect, ConfigError> {
        self.storage
            .dialect
            .parse()
            .map_err(|err| ConfigError::Validation(format!("storage.dialect: {err}")))
    }

    /// The configured transaction isolation level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown level.
    pub fn isolation(&self) -> Result<IsolationLevel, ConfigError> {
        self.storage
            .isolation
            .parse()
            .map_err(|err| ConfigError::Validation(format!("storage.isolation: {err}")))
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.service
            .request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:unistore.db?mode=rwc".to_string(),
            max_connections: 8,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dialect: "sqlite".to_string(),
            isolation: "serializable".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            buffer_size: 1024,
            batch_size: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "unistored=info,unistore_app=info,unistore_adapter_storage_sqlite_sqlx=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
