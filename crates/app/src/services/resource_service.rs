//! Resource service — the logical read/write/watch surface of the store.
//!
//! Validates requests, fills in identity defaults and timestamps, bounds
//! every backend call by the request timeout, and raises folder events once
//! a folder-kind write has committed or timed out mid-flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::Stream;

use unistore_domain::error::{NotFoundError, UnistoreError, ValidationError};
use unistore_domain::event::{FolderMutated, WatchEvent};
use unistore_domain::history::Action;
use unistore_domain::request::{
    DeleteRequest, HistoryRequest, HistoryResponse, ListRequest, ListResponse, ReadOptions,
    ResourceReference,
};
use unistore_domain::resource::{Resource, ResourceKey};
use unistore_domain::response::HealthStatus;
use unistore_domain::time::now;

use crate::event_bus::InProcessEventBus;
use crate::ports::{IdentityProvider, ResourceBackend};

/// Application service for versioned resource CRUD, history and watch.
pub struct ResourceService<B, I> {
    backend: B,
    identity: I,
    bus: Arc<InProcessEventBus>,
    folder_events: Option<mpsc::UnboundedSender<FolderMutated>>,
    request_timeout: Option<Duration>,
}

impl<B, I> ResourceService<B, I>
where
    B: ResourceBackend,
    I: IdentityProvider,
{
    /// Create a new service backed by the given backend.
    ///
    /// `bus` is the bus the history poller publishes on; [`Self::watch`]
    /// subscribes to it.
    pub fn new(backend: B, identity: I, bus: Arc<InProcessEventBus>) -> Self {
        Self {
            backend,
            identity,
            bus,
            folder_events: None,
            request_timeout: None,
        }
    }

    /// Send a [`FolderMutated`] event on `sender` after each committed folder write.
    #[must_use]
    pub fn with_folder_events(mut self, sender: mpsc::UnboundedSender<FolderMutated>) -> Self {
        self.folder_events = Some(sender);
        self
    }

    /// Abort backend calls that take longer than `timeout`.
    ///
    /// The abandoned call's transaction is rolled back unless its commit was
    /// already under way, so a timed-out write has an unknown outcome. A
    /// timed-out folder write still raises its folder event.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, UnistoreError>>,
    ) -> Result<T, UnistoreError> {
        match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(UnistoreError::backend)?,
            None => call.await,
        }
    }

    /// Run a write and raise the folder event for `key` when it may have
    /// committed: on success, and on timeout.
    async fn write(
        &self,
        key: ResourceKey,
        action: Action,
        call: impl Future<Output = Result<Resource, UnistoreError>>,
    ) -> Result<Resource, UnistoreError> {
        let result = match self.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(elapsed) => {
                    tracing::warn!(%key, "write timed out, outcome unknown");
                    self.notify_folder(&key, action);
                    return Err(UnistoreError::backend(elapsed));
                }
            },
            None => call.await,
        };
        let written = result?;
        self.notify_folder(&written.key, action);
        Ok(written)
    }

    fn default_user(&self, supplied: &mut String) {
        if supplied.is_empty() {
            if let Some(user) = self.identity.current_user() {
                *supplied = user;
            }
        }
    }

    fn notify_folder(&self, key: &ResourceKey, action: Action) {
        if !key.is_folder() {
            return;
        }
        if let Some(sender) = &self.folder_events {
            let event = FolderMutated {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
                action,
            };
            if sender.send(event).is_err() {
                tracing::warn!(%key, "folder index rebuilder is gone, event dropped");
            }
        }
    }

    /// Create a resource at version `next(kind)`.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::Validation`] for a malformed key or empty
    /// body, [`UnistoreError::AlreadyExists`] when the key is live, or a
    /// backend error.
    #[tracing::instrument(skip(self, resource), fields(key = %resource.key))]
    pub async fn create(&self, mut resource: Resource) -> Result<Resource, UnistoreError> {
        resource.validate()?;
        self.default_user(&mut resource.created_by);
        if resource.updated_by.is_empty() {
            resource.updated_by.clone_from(&resource.created_by);
        }
        let ts = now();
        resource.created_at = ts;
        resource.updated_at = ts;

        let key = resource.key.clone();
        let created = self
            .write(key, Action::Created, self.backend.create(resource))
            .await?;
        tracing::debug!(version = created.version, "resource created");
        Ok(created)
    }

    /// Update a live resource, optionally guarded by its expected version.
    ///
    /// Empty fields in `resource` keep their stored value (see
    /// [`Resource::merge`]).
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::NotFound`] when the key is not live,
    /// [`UnistoreError::Conflict`] on a stale `previous_version`, or a
    /// validation/backend error.
    #[tracing::instrument(skip(self, resource), fields(key = %resource.key))]
    pub async fn update(
        &self,
        mut resource: Resource,
        previous_version: Option<i64>,
    ) -> Result<Resource, UnistoreError> {
        resource.key.validate()?;
        check_version(previous_version)?;
        self.default_user(&mut resource.updated_by);
        resource.updated_at = now();

        let key = resource.key.clone();
        let updated = self
            .write(
                key,
                Action::Updated,
                self.backend.update(resource, previous_version),
            )
            .await?;
        tracing::debug!(version = updated.version, "resource updated");
        Ok(updated)
    }

    /// Delete a live resource, optionally guarded by its expected version.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::NotFound`] when the key is not live,
    /// [`UnistoreError::Conflict`] on a stale `previous_version`, or a
    /// validation/backend error.
    #[tracing::instrument(skip(self, request), fields(key = %request.key))]
    pub async fn delete(&self, mut request: DeleteRequest) -> Result<Resource, UnistoreError> {
        request.key.validate()?;
        check_version(request.previous_version)?;
        self.default_user(&mut request.deleted_by);

        let key = request.key.clone();
        let deleted = self
            .write(key, Action::Deleted, self.backend.delete(request))
            .await?;
        tracing::debug!(version = deleted.version, "resource deleted");
        Ok(deleted)
    }

    /// Read the live resource, or the snapshot written at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::NotFound`] when nothing matches, or a
    /// validation/backend error.
    #[tracing::instrument(skip(self, key, options), fields(key = %key))]
    pub async fn read(
        &self,
        key: ResourceKey,
        version: Option<i64>,
        options: ReadOptions,
    ) -> Result<Resource, UnistoreError> {
        key.validate()?;
        check_version(version)?;
        let found = self
            .bounded(self.backend.read(key.clone(), version))
            .await?;
        found
            .map(|resource| options.project(resource))
            .ok_or_else(|| NotFoundError { key, version }.into())
    }

    /// List live resources.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::Unimplemented`] for any explicit sort order,
    /// [`UnistoreError::Validation`] for a malformed page token, or a
    /// backend error.
    #[tracing::instrument(skip(self, request), fields(limit = request.effective_limit()))]
    pub async fn list(&self, request: ListRequest) -> Result<ListResponse, UnistoreError> {
        if !request.sort.is_empty() {
            return Err(UnistoreError::Unimplemented("list sort orders"));
        }
        self.bounded(self.backend.list(request)).await
    }

    /// History of a key, newest first.
    ///
    /// # Errors
    ///
    /// Returns a validation or backend error.
    #[tracing::instrument(skip(self, request), fields(key = %request.key))]
    pub async fn history(&self, request: HistoryRequest) -> Result<HistoryResponse, UnistoreError> {
        request.key.validate()?;
        self.bounded(self.backend.history(request)).await
    }

    /// Live resources that reference `(resource_type, uid)`.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    #[tracing::instrument(skip(self))]
    pub async fn find_references(
        &self,
        resource_type: String,
        uid: String,
    ) -> Result<Vec<Resource>, UnistoreError> {
        self.bounded(self.backend.find_references(resource_type, uid))
            .await
    }

    /// Record the outgoing references of a live resource.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::NotFound`] when the key is not live, or a
    /// validation/backend error.
    #[tracing::instrument(
        skip(self, key, references),
        fields(key = %key, count = references.len())
    )]
    pub async fn index_references(
        &self,
        key: ResourceKey,
        references: Vec<ResourceReference>,
    ) -> Result<(), UnistoreError> {
        key.validate()?;
        self.bounded(self.backend.index_references(key, references))
            .await
    }

    /// Subscribe to the change stream. Dropping the stream stops delivery to
    /// this subscriber only; the poller keeps running.
    pub fn watch(&self) -> impl Stream<Item = WatchEvent> + Send + 'static {
        self.bus.stream()
    }

    /// Ping the backend connection. Does not reflect poller liveness.
    pub async fn is_healthy(&self) -> HealthStatus {
        match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.backend.is_healthy())
                .await
                .unwrap_or(HealthStatus::NotServing),
            None => self.backend.is_healthy().await,
        }
    }
}

fn check_version(version: Option<i64>) -> Result<(), ValidationError> {
    match version {
        Some(v) if v <= 0 => Err(ValidationError::InvalidVersion(v)),
        _ => Ok(()),
    }
}
