//! In-process watch event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use unistore_domain::error::UnistoreError;
use unistore_domain::event::WatchEvent;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing never waits for subscribers and succeeds even when there are
/// none (the event is simply dropped). A subscriber that falls more than
/// `capacity` events behind skips the oldest ones.
pub struct InProcessEventBus {
    sender: broadcast::Sender<WatchEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a [`Stream`]. Dropping the stream ends the subscription;
    /// it never affects the publisher.
    pub fn stream(&self) -> impl Stream<Item = WatchEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "watch subscriber lagged, some events were dropped");
                None
            }
        })
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: WatchEvent) -> impl Future<Output = Result<(), UnistoreError>> + Send {
        // broadcast::send fails only when there are zero receivers.
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}
