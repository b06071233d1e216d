//! Folder index port — hierarchy maintenance for folder-kind resources.

use std::future::Future;

use unistore_domain::error::UnistoreError;

/// Rebuilds the derived folder tree of a namespace from its live folders.
pub trait FolderIndex {
    fn rebuild(&self, namespace: String) -> impl Future<Output = Result<(), UnistoreError>> + Send;
}

impl<T: FolderIndex + Send + Sync> FolderIndex for std::sync::Arc<T> {
    fn rebuild(&self, namespace: String) -> impl Future<Output = Result<(), UnistoreError>> + Send {
        (**self).rebuild(namespace)
    }
}
