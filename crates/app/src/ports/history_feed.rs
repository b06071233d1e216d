//! History feed port — read-only access to the history ledger for the poller.

use std::future::Future;

use unistore_domain::error::UnistoreError;
use unistore_domain::event::WatchEvent;
use unistore_domain::resource::ResourceKind;

/// Scans `resource_history` without ever mutating it.
pub trait HistoryFeed {
    /// Highest version allocated so far for every known kind.
    fn latest_versions(
        &self,
    ) -> impl Future<Output = Result<Vec<(ResourceKind, i64)>, UnistoreError>> + Send;

    /// Up to `limit` history rows of `kind` with version strictly greater
    /// than `since`, oldest first.
    fn changes_since(
        &self,
        kind: ResourceKind,
        since: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<WatchEvent>, UnistoreError>> + Send;
}
