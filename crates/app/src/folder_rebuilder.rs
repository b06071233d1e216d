//! Folder-index rebuilder — reacts to committed folder writes.
//!
//! The resource service sends a [`FolderMutated`] event after every
//! successful write on the folder kind. This task drains the channel,
//! coalesces pending events per namespace and rebuilds each namespace's
//! folder index once per batch.

use std::collections::BTreeSet;

use tokio::sync::mpsc;

use unistore_domain::event::FolderMutated;

use crate::ports::FolderIndex;

/// Create the channel connecting the resource service to the rebuilder.
#[must_use]
pub fn channel() -> (
    mpsc::UnboundedSender<FolderMutated>,
    mpsc::UnboundedReceiver<FolderMutated>,
) {
    mpsc::unbounded_channel()
}

/// Background consumer of [`FolderMutated`] events.
pub struct FolderIndexRebuilder<F> {
    index: F,
    events: mpsc::UnboundedReceiver<FolderMutated>,
}

impl<F: FolderIndex> FolderIndexRebuilder<F> {
    pub fn new(index: F, events: mpsc::UnboundedReceiver<FolderMutated>) -> Self {
        Self { index, events }
    }

    /// Rebuild until every sender is dropped.
    ///
    /// Rebuild failures are logged; the next event for the namespace
    /// triggers another attempt.
    pub async fn run(mut self) {
        while let Some(first) = self.events.recv().await {
            let mut namespaces = BTreeSet::from([first.namespace]);
            while let Ok(next) = self.events.try_recv() {
                namespaces.insert(next.namespace);
            }

            for namespace in namespaces {
                match self.index.rebuild(namespace.clone()).await {
                    Ok(()) => tracing::debug!(%namespace, "folder index rebuilt"),
                    Err(err) => {
                        tracing::warn!(%namespace, error = %err, "folder index rebuild failed");
                    }
                }
            }
        }
        tracing::info!("folder index rebuilder stopped");
    }
}
