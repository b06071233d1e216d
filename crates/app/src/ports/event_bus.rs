//! Event bus port — publish/subscribe for watch events.

use std::future::Future;

use unistore_domain::error::UnistoreError;
use unistore_domain::event::WatchEvent;

/// Publishes watch events to interested subscribers.
///
/// Implementations must not block on slow subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: WatchEvent) -> impl Future<Output = Result<(), UnistoreError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: WatchEvent) -> impl Future<Output = Result<(), UnistoreError>> + Send {
        (**self).publish(event)
    }
}
