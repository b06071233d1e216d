//! Storage port — the versioned resource backend.
//!
//! Every mutating method runs in exactly one transaction: it either commits
//! the live row, the history row and the version counter together, or none
//! of them. Dropping a returned future before completion rolls the open
//! transaction back.

use std::future::Future;

use unistore_domain::error::UnistoreError;
use unistore_domain::request::{
    DeleteRequest, HistoryRequest, HistoryResponse, ListRequest, ListResponse, ResourceReference,
};
use unistore_domain::resource::{Resource, ResourceKey};
use unistore_domain::response::HealthStatus;

/// Persistence for versioned resources and their history.
pub trait ResourceBackend {
    /// Create a new live row and its first history row.
    ///
    /// Assigns guid, etag, size and the next version of the key's kind.
    fn create(
        &self,
        resource: Resource,
    ) -> impl Future<Output = Result<Resource, UnistoreError>> + Send;

    /// Merge `resource` over the live row and append a history row.
    ///
    /// Fails with [`UnistoreError::Conflict`] when `previous_version` is set
    /// and differs from the stored version.
    fn update(
        &self,
        resource: Resource,
        previous_version: Option<i64>,
    ) -> impl Future<Output = Result<Resource, UnistoreError>> + Send;

    /// Remove the live row and append a deletion history row.
    ///
    /// Returns the tombstone, stamped with the deletion version.
    fn delete(
        &self,
        request: DeleteRequest,
    ) -> impl Future<Output = Result<Resource, UnistoreError>> + Send;

    /// Read the live row, or the history row at `version`.
    fn read(
        &self,
        key: ResourceKey,
        version: Option<i64>,
    ) -> impl Future<Output = Result<Option<Resource>, UnistoreError>> + Send;

    /// List live rows matching the request filter.
    fn list(
        &self,
        request: ListRequest,
    ) -> impl Future<Output = Result<ListResponse, UnistoreError>> + Send;

    /// History rows for one key, newest first.
    fn history(
        &self,
        request: HistoryRequest,
    ) -> impl Future<Output = Result<HistoryResponse, UnistoreError>> + Send;

    /// Live resources that reference `(resource_type, uid)`.
    fn find_references(
        &self,
        resource_type: String,
        uid: String,
    ) -> impl Future<Output = Result<Vec<Resource>, UnistoreError>> + Send;

    /// Replace the outgoing references recorded for a live resource.
    fn index_references(
        &self,
        key: ResourceKey,
        references: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<(), UnistoreError>> + Send;

    /// Ping the underlying connection.
    fn is_healthy(&self) -> impl Future<Output = HealthStatus> + Send;
}
