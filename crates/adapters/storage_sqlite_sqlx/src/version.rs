//! Version counter — one strictly increasing counter per resource kind.
//!
//! Allocation happens inside the caller's transaction: the increment is
//! committed or rolled back together with the write that consumes it, and
//! the counter row stays locked until then.

use sqlx::{SqliteConnection, SqlitePool};

use unistore_domain::resource::ResourceKind;

use crate::dialect::{Dialect, Select, SqlValue};
use crate::error::{StorageError, is_unique_violation};
use crate::row::kind_filter;
use crate::tx::{query, query_as};

const TABLE: &str = "resource_version";
const COLUMN: &str = "resource_version";

/// Allocate the next version of `kind`.
///
/// Increments the kind's counter row; when none exists yet, creates it at 1.
/// A concurrent first writer creating the same row is retried once, a
/// second collision surfaces as [`StorageError::Database`].
///
/// # Errors
///
/// Returns [`StorageError`] when a statement fails.
pub(crate) async fn next_version(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    kind: &ResourceKind,
) -> Result<i64, StorageError> {
    let mut retried = false;
    loop {
        let bump = dialect.increment(TABLE, COLUMN, kind_filter(kind))?;
        let affected = query(&bump).execute(&mut *conn).await?.rows_affected();

        if affected == 0 {
            let insert = dialect.insert(
                TABLE,
                vec![
                    ("namespace", SqlValue::from(kind.namespace.as_str())),
                    ("group", SqlValue::from(kind.group.as_str())),
                    ("resource", SqlValue::from(kind.resource.as_str())),
                    (COLUMN, SqlValue::Int(1)),
                ],
            )?;
            match query(&insert).execute(&mut *conn).await {
                Ok(_) => return Ok(1),
                Err(err) if !retried && is_unique_violation(&err) => {
                    tracing::debug!(%kind, "version row created concurrently, retrying");
                    retried = true;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let select = dialect.select(
            Select::table(TABLE)
                .columns(&[COLUMN])
                .filters(kind_filter(kind)),
        )?;
        let (version,): (i64,) = query_as(&select).fetch_one(&mut *conn).await?;
        return Ok(version);
    }
}

/// Highest allocated version of every kind.
///
/// # Errors
///
/// Returns [`StorageError`] when the query fails.
pub(crate) async fn latest_versions(
    pool: &SqlitePool,
    dialect: Dialect,
) -> Result<Vec<(ResourceKind, i64)>, StorageError> {
    let select = dialect.select(Select::table(TABLE).columns(&[
        "namespace",
        "group",
        "resource",
        COLUMN,
    ]))?;
    let rows: Vec<(String, String, String, i64)> = query_as(&select).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(namespace, group, resource, version)| {
            (ResourceKind::new(namespace, group, resource), version)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    fn dash() -> ResourceKind {
        ResourceKind::new("ns1", "grp", "dash")
    }

    #[tokio::test]
    async fn should_start_at_one_and_increase_per_kind() {
        let db = Config::in_memory().build().await.unwrap();
        let executor = db.executor();
        let folders = ResourceKind::new("ns1", "grp", "folders");

        let mut tx = executor.begin().await.unwrap();
        let mut allocated = Vec::new();
        for _ in 0..3 {
            allocated.push(next_version(&mut tx, Dialect::Sqlite, &dash()).await.unwrap());
        }
        let other = next_version(&mut tx, Dialect::Sqlite, &folders).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(allocated, vec![1, 2, 3]);
        assert_eq!(other, 1);
    }

    #[tokio::test]
    async fn should_discard_allocation_when_transaction_rolls_back() {
        let db = Config::in_memory().build().await.unwrap();
        let executor = db.executor();

        let mut tx = executor.begin().await.unwrap();
        next_version(&mut tx, Dialect::Sqlite, &dash()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = executor.begin().await.unwrap();
        assert_eq!(next_version(&mut tx, Dialect::Sqlite, &dash()).await.unwrap(), 2);
        drop(tx);

        let latest = latest_versions(db.pool(), Dialect::Sqlite).await.unwrap();
        assert_eq!(latest, vec![(dash(), 1)]);
    }

    #[tokio::test]
    async fn should_report_no_kinds_on_empty_store() {
        let db = Config::in_memory().build().await.unwrap();
        let latest = latest_versions(db.pool(), Dialect::Sqlite).await.unwrap();
        assert!(latest.is_empty());
    }
}
