//! Events — change notifications derived from the history ledger.
//!
//! [`WatchEvent`]s are produced by the history poller and delivered to watch
//! subscribers. [`FolderMutated`] is raised after a committed write on the
//! folder kind and consumed by the folder-index rebuilder.

use serde::{Deserialize, Serialize};

use crate::history::{Action, HistoryEntry};
use crate::resource::{Resource, ResourceKey, ResourceKind};

/// A change observed in `resource_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub key: ResourceKey,
    pub action: Action,
    pub version: i64,
    pub previous_version: Option<i64>,
    /// Snapshot written at `version`; for deletions, the last live state.
    pub value: Resource,
}

impl WatchEvent {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.key.kind()
    }
}

impl From<HistoryEntry> for WatchEvent {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            key: entry.resource.key.clone(),
            action: entry.action,
            version: entry.resource.version,
            previous_version: entry.previous_version,
            value: entry.resource,
        }
    }
}

/// A folder-kind resource was written in `namespace`; its hierarchy index is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMutated {
    pub namespace: String,
    pub name: String,
    pub action: Action,
}
