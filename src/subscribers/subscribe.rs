//! # Subscriber trait.
//!
//! Each subscriber runs on its own worker task fed by a bounded queue owned by
//! [`SubscriberSet`](crate::SubscriberSet). A slow subscriber never blocks the
//! publisher or its siblings; on overflow its events are dropped and a
//! `SubscriberOverflow` event is published.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and overflow events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
