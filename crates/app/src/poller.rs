//! History poller — republishes new history rows as watch events.
//!
//! A single long-lived task per backend. Each tick it asks the feed for the
//! latest version of every kind and, for each kind that moved past its
//! cursor, pulls the newer rows oldest-first and publishes them.
//!
//! Cursors are kept per kind because versions are allocated per kind. A
//! cursor only advances past events that were read *and* published, so a
//! failed or interrupted tick retries the same window on the next one:
//! delivery is at-least-once.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;

use unistore_domain::error::UnistoreError;
use unistore_domain::resource::ResourceKind;

use crate::ports::{EventPublisher, HistoryFeed};

/// Tuning for the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Maximum rows fetched per query; a tick keeps paging until a short page.
    /// Values below 1 are treated as 1.
    pub batch_size: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            batch_size: 100,
        }
    }
}

/// Background task turning history rows into watch events.
pub struct HistoryPoller<F, P> {
    feed: F,
    publisher: P,
    config: PollerConfig,
    since: HashMap<ResourceKind, i64>,
}

impl<F, P> HistoryPoller<F, P>
where
    F: HistoryFeed,
    P: EventPublisher,
{
    pub fn new(feed: F, publisher: P, mut config: PollerConfig) -> Self {
        config.batch_size = config.batch_size.max(1);
        Self {
            feed,
            publisher,
            config,
            since: HashMap::new(),
        }
    }

    /// Position every known kind at its current latest version, so that only
    /// writes committed after start-up are published.
    ///
    /// # Errors
    ///
    /// Returns the feed error; the poller must not start without a baseline.
    pub async fn initialize(&mut self) -> Result<(), UnistoreError> {
        let latest = self.feed.latest_versions().await?;
        tracing::info!(kinds = latest.len(), "history poller initialised");
        self.since = latest.into_iter().collect();
        Ok(())
    }

    /// Run one poll pass over every kind.
    ///
    /// Returns how many events were published.
    ///
    /// # Errors
    ///
    /// Returns the first feed error. Cursors of kinds processed before the
    /// failure keep their progress; the failing kind keeps its previous cursor.
    pub async fn tick(&mut self) -> Result<usize, UnistoreError> {
        let latest = self.feed.latest_versions().await?;
        let mut published = 0;

        for (kind, latest_version) in latest {
            let since = self.since.get(&kind).copied().unwrap_or(0);
            if latest_version <= since {
                continue;
            }
            published += self.drain_kind(kind, since).await?;
        }

        Ok(published)
    }

    async fn drain_kind(
        &mut self,
        kind: ResourceKind,
        mut since: i64,
    ) -> Result<usize, UnistoreError> {
        let mut published = 0;
        loop {
            let events = self
                .feed
                .changes_since(kind.clone(), since, self.config.batch_size)
                .await?;
            let count = events.len();

            for event in events {
                let version = event.version;
                self.publisher.publish(event).await?;
                since = since.max(version);
                self.since.insert(kind.clone(), since);
                published += 1;
            }

            if count < self.config.batch_size {
                break;
            }
        }
        tracing::debug!(%kind, since, published, "history poller caught up");
        Ok(published)
    }

    /// Poll until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// An in-flight tick is allowed to finish; only future ticks are
    /// cancelled. Tick errors are logged and retried on the next interval.
    ///
    /// # Errors
    ///
    /// Returns an error only when the initial baseline cannot be read.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), UnistoreError> {
        self.initialize().await?;

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        tracing::warn!(error = %err, "history poll failed, retrying next interval");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("history poller stopped");
        Ok(())
    }
}
