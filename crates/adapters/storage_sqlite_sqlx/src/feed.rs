//! `SQLite` implementation of [`HistoryFeed`].
//!
//! Read-only: the feed never touches `resource` or `resource_version` rows
//! beyond reading the latter, so the poller cannot contend with writers.

use sqlx::SqlitePool;

use unistore_app::ports::HistoryFeed;
use unistore_domain::error::UnistoreError;
use unistore_domain::event::WatchEvent;
use unistore_domain::resource::ResourceKind;

use crate::dialect::{Condition, Dialect, Order, Select};
use crate::error::StorageError;
use crate::row::{HISTORY, HistoryWrapper, kind_filter};
use crate::tx::query_as;
use crate::version::latest_versions;

/// History scanner used by the watch poller.
#[derive(Debug, Clone)]
pub struct SqlHistoryFeed {
    pool: SqlitePool,
    dialect: Dialect,
}

impl SqlHistoryFeed {
    #[must_use]
    pub fn new(pool: SqlitePool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }
}

impl HistoryFeed for SqlHistoryFeed {
    async fn latest_versions(&self) -> Result<Vec<(ResourceKind, i64)>, UnistoreError> {
        Ok(latest_versions(&self.pool, self.dialect).await?)
    }

    async fn changes_since(
        &self,
        kind: ResourceKind,
        since: i64,
        limit: usize,
    ) -> Result<Vec<WatchEvent>, UnistoreError> {
        let select = Select::table(HISTORY)
            .filters(kind_filter(&kind))
            .filter(Condition::gt("version", since))
            .order_by("version", Order::Asc)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX));
        let statement = self.dialect.select(select).map_err(StorageError::from)?;

        let rows: Vec<HistoryWrapper> = query_as(&statement)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| WatchEvent::from(w.0)).collect())
    }
}
