//! Request and response shapes for the read side of the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;
use crate::resource::{Resource, ResourceKey};

/// Page size used by `List` when the caller asks for zero rows.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Upper bound on a single `List` page.
pub const MAX_LIST_LIMIT: usize = 1000;
/// Upper bound on a single `History` page, whatever the caller asks for.
pub const MAX_HISTORY_PAGE_SIZE: usize = 100;

/// Which parts of a resource `Read` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReadOptions {
    pub with_body: bool,
    pub with_meta: bool,
    pub with_status: bool,
    pub with_labels: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            with_body: true,
            with_meta: true,
            with_status: true,
            with_labels: true,
        }
    }
}

impl ReadOptions {
    /// Blank out the parts that were not requested.
    #[must_use]
    pub fn project(self, mut resource: Resource) -> Resource {
        if !self.with_body {
            resource.body.clear();
        }
        if !self.with_meta {
            resource.meta.clear();
        }
        if !self.with_status {
            resource.status.clear();
        }
        if !self.with_labels {
            resource.labels.clear();
        }
        resource
    }
}

/// Predicates applied by `List`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub namespace: Option<String>,
    pub group: Option<String>,
    pub resource: Option<String>,
    pub name_prefix: Option<String>,
    pub folder: Option<String>,
    /// Every pair must be present on the resource (equality selector).
    pub labels: BTreeMap<String, String>,
}

/// A requested ordering for `List`. Only the default key order is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub filter: ListFilter,
    /// `0` selects [`DEFAULT_LIST_LIMIT`].
    pub limit: usize,
    pub page_token: Option<String>,
    pub sort: Vec<SortBy>,
}

impl ListRequest {
    /// Page size actually used, clamped to `1..=MAX_LIST_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_LIST_LIMIT,
            n => n.min(MAX_LIST_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<Resource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub key: ResourceKey,
    /// `None` or `0` selects [`MAX_HISTORY_PAGE_SIZE`].
    pub limit: Option<usize>,
    pub page_token: Option<String>,
}

impl HistoryRequest {
    #[must_use]
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Page size actually used, capped at [`MAX_HISTORY_PAGE_SIZE`].
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            None | Some(0) => MAX_HISTORY_PAGE_SIZE,
            Some(n) => n.min(MAX_HISTORY_PAGE_SIZE),
        }
    }
}

/// History rows for one key, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub versions: Vec<HistoryEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: ResourceKey,
    pub previous_version: Option<i64>,
    /// Recorded as `updated_by` on the deletion row.
    pub deleted_by: String,
    pub message: String,
}

impl DeleteRequest {
    #[must_use]
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn previous_version(mut self, version: i64) -> Self {
        self.previous_version = Some(version);
        self
    }
}

/// An outgoing edge from a resource to `(resource_type, uid)`, used by `FindReferences`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceReference {
    pub resource_type: String,
    pub uid: String,
}

impl ResourceReference {
    pub fn new(resource_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            uid: uid.into(),
        }
    }
}
