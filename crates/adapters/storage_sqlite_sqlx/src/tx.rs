//! Transaction executor and statement binding.
//!
//! Every mutation runs inside one transaction opened by [`TxExecutor::begin`].
//! The returned [`Transaction`] rolls back when dropped without
//! [`Transaction::commit`], so a cancelled or timed-out caller never leaves
//! partial work behind.

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::dialect::{Dialect, IsolationLevel, SqlValue, Statement};
use crate::error::StorageError;

/// Opens transactions at a fixed isolation level.
#[derive(Debug, Clone)]
pub struct TxExecutor {
    pool: SqlitePool,
    dialect: Dialect,
    isolation: IsolationLevel,
}

impl TxExecutor {
    #[must_use]
    pub fn new(pool: SqlitePool, isolation: IsolationLevel) -> Self {
        Self {
            pool,
            dialect: Dialect::Sqlite,
            isolation,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] when no connection can be acquired
    /// or the engine refuses the begin statement.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        let statement = self.dialect.begin_statement(self.isolation);
        let tx = self.pool.begin_with(statement).await?;
        Ok(tx)
    }
}

/// Bind a rendered statement for execution.
pub(crate) fn query(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .args
        .iter()
        .fold(sqlx::query(&statement.sql), |query, arg| match arg {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Bytes(value) => query.bind(value.as_slice()),
        })
}

/// Bind a rendered statement whose rows decode into `O`.
pub(crate) fn query_as<O>(statement: &Statement) -> QueryAs<'_, Sqlite, O, SqliteArguments<'_>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    statement
        .args
        .iter()
        .fold(sqlx::query_as(&statement.sql), |query, arg| match arg {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Bytes(value) => query.bind(value.as_slice()),
        })
}
