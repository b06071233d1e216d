//! Status-carrying responses for the write surface and health checks.
//!
//! Callers must check [`WriteResponse::status`] before trusting
//! [`WriteResponse::resource`]: an `Error` response carries the zero-value
//! resource, not an absent one.

use crate::error::UnistoreError;
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Created,
    Updated,
    Deleted,
    NotFound,
    Error,
}

#[derive(Debug)]
pub struct WriteResponse {
    pub status: WriteStatus,
    pub resource: Resource,
    pub error: Option<UnistoreError>,
}

impl WriteResponse {
    fn from_result(result: Result<Resource, UnistoreError>, success: WriteStatus) -> Self {
        match result {
            Ok(resource) => Self {
                status: success,
                resource,
                error: None,
            },
            Err(err) => Self {
                status: WriteStatus::Error,
                resource: Resource::default(),
                error: Some(err),
            },
        }
    }

    #[must_use]
    pub fn created(result: Result<Resource, UnistoreError>) -> Self {
        Self::from_result(result, WriteStatus::Created)
    }

    #[must_use]
    pub fn updated(result: Result<Resource, UnistoreError>) -> Self {
        Self::from_result(result, WriteStatus::Updated)
    }

    /// Unlike create/update, a delete of a missing key reports `NotFound`.
    #[must_use]
    pub fn deleted(result: Result<Resource, UnistoreError>) -> Self {
        match result {
            Err(err @ UnistoreError::NotFound(_)) => Self {
                status: WriteStatus::NotFound,
                resource: Resource::default(),
                error: Some(err),
            },
            other => Self::from_result(other, WriteStatus::Deleted),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            WriteStatus::Created | WriteStatus::Updated | WriteStatus::Deleted
        )
    }
}

/// Liveness of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Serving,
    NotServing,
}
