//! Resource — an opaque, versioned payload addressed by a [`ResourceKey`].
//!
//! The store never interprets `body`, `meta` or `status`; they are byte
//! sequences tagged by `group_version`, validated by collaborators outside
//! this core.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{UnistoreError, ValidationError};
use crate::id::ResourceGuid;
use crate::time::Timestamp;

/// Maximum length of any key segment.
pub const MAX_SEGMENT_LEN: usize = 253;

/// Resource type whose writes trigger a folder-index rebuild.
pub const FOLDER_RESOURCE: &str = "folders";

/// Identifies a resource kind: the unit of version allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKind {
    pub namespace: String,
    pub group: String,
    pub resource: String,
}

impl ResourceKind {
    pub fn new(
        namespace: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            group: group.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.group, self.resource)
    }
}

/// Uniquely identifies a logical object across its lifetime.
///
/// An empty `namespace` denotes a cluster-scoped resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub group: String,
    pub resource: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        namespace: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            group: group.into(),
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// The kind this key belongs to.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::new(&self.namespace, &self.group, &self.resource)
    }

    /// Whether writes on this key must trigger a folder-index rebuild.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.resource == FOLDER_RESOURCE
    }

    /// Check key invariants.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::Validation`] when a required segment is
    /// empty, too long, or contains `/` or whitespace.
    pub fn validate(&self) -> Result<(), UnistoreError> {
        if self.group.is_empty() {
            return Err(ValidationError::EmptyGroup.into());
        }
        if self.resource.is_empty() {
            return Err(ValidationError::EmptyResource.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        check_segment("namespace", &self.namespace)?;
        check_segment("group", &self.group)?;
        check_segment("resource", &self.resource)?;
        check_segment("name", &self.name)?;
        Ok(())
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_SEGMENT_LEN {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max: MAX_SEGMENT_LEN,
        });
    }
    if value.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(ValidationError::InvalidCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.group, self.resource, self.name
        )
    }
}

/// Where a resource came from when it was provisioned by another system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub source: String,
    pub key: String,
    pub time: Option<Timestamp>,
}

/// A resource as stored in the live table or in one history row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub guid: ResourceGuid,
    pub key: ResourceKey,
    /// Schema version of the payload (e.g. `v1beta1`).
    pub group_version: String,
    /// Name of the parent folder, if any.
    pub folder: Option<String>,
    pub version: i64,
    pub size: i64,
    pub etag: String,
    pub body: Vec<u8>,
    pub meta: Vec<u8>,
    pub status: Vec<u8>,
    pub labels: BTreeMap<String, String>,
    pub fields: BTreeMap<String, String>,
    pub created_at: Timestamp,
    pub created_by: String,
    pub updated_at: Timestamp,
    pub updated_by: String,
    pub origin: Option<Origin>,
    /// Commit-message-like annotation for this write.
    pub message: String,
}

impl Resource {
    /// Create a builder for constructing a [`Resource`].
    #[must_use]
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Check the invariants required to create this resource.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::Validation`] when the key is malformed or the
    /// body is empty.
    pub fn validate(&self) -> Result<(), UnistoreError> {
        self.key.validate()?;
        if self.body.is_empty() {
            return Err(ValidationError::EmptyBody.into());
        }
        Ok(())
    }

    /// Recompute `etag` and `size` from the current payload.
    pub fn seal(&mut self) {
        self.etag = compute_etag(&self.body, &self.meta, &self.status);
        self.size = i64::try_from(self.body.len()).unwrap_or(i64::MAX);
    }

    /// Apply an update request on top of this (current) resource.
    ///
    /// Empty fields of `patch` keep the current value: there is no way to
    /// clear `body`, `meta`, `status`, `labels`, `fields`, `folder` or
    /// `group_version` through an update. `message` and `origin` describe the
    /// write itself and are taken from `patch` as-is. Key, guid and creation
    /// columns are immutable.
    pub fn merge(&mut self, patch: Resource) {
        if !patch.group_version.is_empty() {
            self.group_version = patch.group_version;
        }
        if patch.folder.is_some() {
            self.folder = patch.folder;
        }
        if !patch.body.is_empty() {
            self.body = patch.body;
        }
        if !patch.meta.is_empty() {
            self.meta = patch.meta;
        }
        if !patch.status.is_empty() {
            self.status = patch.status;
        }
        if !patch.labels.is_empty() {
            self.labels = patch.labels;
        }
        if !patch.fields.is_empty() {
            self.fields = patch.fields;
        }
        self.updated_at = patch.updated_at;
        self.updated_by = patch.updated_by;
        self.origin = patch.origin;
        self.message = patch.message;
    }
}

/// Deterministic content hash over `(body, meta, status)`.
///
/// Each part is length-prefixed so that moving bytes between parts changes
/// the hash.
#[must_use]
pub fn compute_etag(body: &[u8], meta: &[u8], status: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [body, meta, status] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().to_hex().to_string()
}

/// Step-by-step builder for [`Resource`].
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    key: ResourceKey,
    group_version: String,
    folder: Option<String>,
    body: Vec<u8>,
    meta: Vec<u8>,
    status: Vec<u8>,
    labels: BTreeMap<String, String>,
    fields: BTreeMap<String, String>,
    created_by: String,
    origin: Option<Origin>,
    message: String,
}

impl ResourceBuilder {
    #[must_use]
    pub fn key(mut self, key: ResourceKey) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn group_version(mut self, group_version: impl Into<String>) -> Self {
        self.group_version = group_version.into();
        self
    }

    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: impl Into<Vec<u8>>) -> Self {
        self.meta = meta.into();
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<Vec<u8>>) -> Self {
        self.status = status.into();
        self
    }

    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Consume the builder and return an unsealed [`Resource`].
    ///
    /// Guid, version and etag are assigned by the store on write.
    #[must_use]
    pub fn build(self) -> Resource {
        let ts = crate::time::now();
        Resource {
            key: self.key,
            group_version: self.group_version,
            folder: self.folder,
            body: self.body,
            meta: self.meta,
            status: self.status,
            labels: self.labels,
            fields: self.fields,
            created_at: ts,
            updated_by: self.created_by.clone(),
            created_by: self.created_by,
            updated_at: ts,
            origin: self.origin,
            message: self.message,
            ..Resource::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ResourceKey {
        ResourceKey::new("ns1", "grp", "dash", "a")
    }

    #[test]
    fn should_accept_valid_key() {
        assert!(key().validate().is_ok());
    }

    #[test]
    fn should_accept_cluster_scoped_key() {
        let key = ResourceKey::new("", "grp", "dash", "a");
        assert!(key.validate().is_ok());
    }

    #[test]
    fn should_reject_key_without_name() {
        let key = ResourceKey::new("ns1", "grp", "dash", "");
        assert!(matches!(
            key.validate(),
            Err(UnistoreError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_key_without_group() {
        let key = ResourceKey::new("ns1", "", "dash", "a");
        assert!(matches!(
            key.validate(),
            Err(UnistoreError::Validation(ValidationError::EmptyGroup))
        ));
    }

    #[test]
    fn should_reject_name_with_slash() {
        let key = ResourceKey::new("ns1", "grp", "dash", "a/b");
        assert!(matches!(
            key.validate(),
            Err(UnistoreError::Validation(
                ValidationError::InvalidCharacter { field: "name", .. }
            ))
        ));
    }

    #[test]
    fn should_reject_overlong_segment() {
        let key = ResourceKey::new("ns1", "grp", "dash", "x".repeat(MAX_SEGMENT_LEN + 1));
        assert!(matches!(
            key.validate(),
            Err(UnistoreError::Validation(ValidationError::TooLong { .. }))
        ));
    }

    #[test]
    fn should_reject_resource_without_body() {
        let resource = Resource::builder().key(key()).build();
        assert!(matches!(
            resource.validate(),
            Err(UnistoreError::Validation(ValidationError::EmptyBody))
        ));
    }

    #[test]
    fn should_compute_deterministic_etag() {
        let a = compute_etag(b"{}", b"m", b"s");
        let b = compute_etag(b"{}", b"m", b"s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn should_change_etag_when_bytes_move_between_parts() {
        let a = compute_etag(b"ab", b"", b"");
        let b = compute_etag(b"a", b"b", b"");
        assert_ne!(a, b);
    }

    #[test]
    fn should_seal_size_and_etag() {
        let mut resource = Resource::builder()
            .key(key())
            .body(r#"{"title":"x"}"#)
            .build();
        resource.seal();
        assert_eq!(resource.size, 13);
        assert_eq!(resource.etag, compute_etag(&resource.body, b"", b""));
    }

    #[test]
    fn should_keep_existing_values_when_patch_fields_are_empty() {
        let mut current = Resource::builder()
            .key(key())
            .body("old")
            .meta("meta")
            .label("env", "prod")
            .folder("f1")
            .message("first")
            .build();
        let patch = Resource::builder()
            .key(key())
            .body("new")
            .message("second")
            .build();

        current.merge(patch);

        assert_eq!(current.body, b"new");
        assert_eq!(current.meta, b"meta");
        assert_eq!(current.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(current.folder.as_deref(), Some("f1"));
        assert_eq!(current.message, "second");
    }

    #[test]
    fn should_detect_folder_kind() {
        assert!(ResourceKey::new("ns1", "folder.app", FOLDER_RESOURCE, "f").is_folder());
        assert!(!key().is_folder());
    }

    #[test]
    fn should_display_key_as_path() {
        assert_eq!(key().to_string(), "ns1/grp/dash/a");
        assert_eq!(key().kind().to_string(), "ns1/grp/dash");
    }
}
