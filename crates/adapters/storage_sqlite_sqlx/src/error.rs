//! Storage-specific error type wrapping sqlx errors.

use unistore_domain::error::UnistoreError;

use crate::dialect::DialectError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The statement builder rejected its input.
    #[error("SQL generation error")]
    Dialect(#[from] DialectError),
}

impl From<StorageError> for UnistoreError {
    fn from(err: StorageError) -> Self {
        Self::BackendUnavailable(Box::new(err))
    }
}

/// Whether `err` is a primary-key or unique-index violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
