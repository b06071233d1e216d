//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::backend::SqlResourceBackend;
use crate::dialect::IsolationLevel;
use crate::error::StorageError;
use crate::feed::SqlHistoryFeed;
use crate::folder_index::SqlFolderIndex;
use crate::tx::TxExecutor;

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:unistore.db` or `sqlite::memory:`).
    pub database_url: String,
    pub max_connections: u32,
    pub isolation: IsolationLevel,
}

impl Config {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            isolation: IsolationLevel::default(),
        }
    }

    /// A private in-memory database, shared by every connection of the pool.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(self).await
    }
}

/// Holds the `SQLite` connection pool and hands out the port implementations.
pub struct Database {
    executor: TxExecutor,
}

impl Database {
    /// Connect to the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    async fn initialize(config: Config) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(
            url = %config.database_url,
            isolation = config.isolation.as_sql(),
            "database ready"
        );

        Ok(Self {
            executor: TxExecutor::new(pool, config.isolation),
        })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        self.executor.pool()
    }

    #[must_use]
    pub fn executor(&self) -> &TxExecutor {
        &self.executor
    }

    #[must_use]
    pub fn backend(&self) -> SqlResourceBackend {
        SqlResourceBackend::new(self.executor.clone())
    }

    #[must_use]
    pub fn history_feed(&self) -> SqlHistoryFeed {
        SqlHistoryFeed::new(self.pool().clone(), self.executor.dialect())
    }

    #[must_use]
    pub fn folder_index(&self) -> SqlFolderIndex {
        SqlFolderIndex::new(self.executor.clone())
    }
}
