//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`UnistoreError`] via `#[from]`. Adapters box their own error types into
//! [`UnistoreError::BackendUnavailable`].

use crate::resource::ResourceKey;

/// Top-level error returned by every port and service in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum UnistoreError {
    /// The request was malformed.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// No live (or historical) row matched the key.
    #[error("resource not found")]
    NotFound(#[from] NotFoundError),

    /// A create targeted a key that already has a live row.
    #[error("resource already exists")]
    AlreadyExists(#[from] AlreadyExistsError),

    /// The caller's expected version did not match the stored one.
    #[error("version conflict")]
    Conflict(#[from] ConflictError),

    /// The connection or transaction failed.
    #[error("backend unavailable")]
    BackendUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation is recognised but intentionally not supported.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

/// Request validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("group must not be empty")]
    EmptyGroup,
    #[error("resource type must not be empty")]
    EmptyResource,
    #[error("name must not be empty")]
    EmptyName,
    #[error("{field} is too long ({len} > {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{field} contains an invalid character: {value:?}")]
    InvalidCharacter { field: &'static str, value: String },
    #[error("body must not be empty")]
    EmptyBody,
    #[error("version must be positive, got {0}")]
    InvalidVersion(i64),
    #[error("invalid page token")]
    InvalidPageToken,
}

/// The requested key has no matching row.
#[derive(Debug, thiserror::Error)]
#[error("{key} not found{}", .version.map(|v| format!(" at version {v}")).unwrap_or_default())]
pub struct NotFoundError {
    pub key: ResourceKey,
    pub version: Option<i64>,
}

/// A create collided with a live row.
#[derive(Debug, thiserror::Error)]
#[error("{key} already exists")]
pub struct AlreadyExistsError {
    pub key: ResourceKey,
}

/// Optimistic-lock failure.
#[derive(Debug, thiserror::Error)]
#[error("{key} is at version {actual}, expected {expected}")]
pub struct ConflictError {
    pub key: ResourceKey,
    pub expected: i64,
    pub actual: i64,
}

impl UnistoreError {
    /// Wrap any adapter error as a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::BackendUnavailable(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ResourceKey {
        ResourceKey::new("ns1", "grp", "dash", "a")
    }

    #[test]
    fn should_display_not_found_with_version() {
        let err = NotFoundError {
            key: key(),
            version: Some(3),
        };
        assert_eq!(err.to_string(), "ns1/grp/dash/a not found at version 3");
    }

    #[test]
    fn should_display_not_found_without_version() {
        let err = NotFoundError {
            key: key(),
            version: None,
        };
        assert_eq!(err.to_string(), "ns1/grp/dash/a not found");
    }

    #[test]
    fn should_convert_conflict_into_top_level_error() {
        let err: UnistoreError = ConflictError {
            key: key(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, UnistoreError::Conflict(_)));
    }

    #[test]
    fn should_box_foreign_error_as_backend_unavailable() {
        let io = std::io::Error::other("connection reset");
        let err = UnistoreError::backend(io);
        assert!(matches!(err, UnistoreError::BackendUnavailable(_)));
    }
}
