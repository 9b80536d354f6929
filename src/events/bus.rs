//! # Event bus for runtime events.
//!
//! ```text
//! Publishers (many):                  Listener (one):
//!   WorkerActor ──┐
//!   Runner      ──┼──────► Bus ───────► supervisor listener ────► SubscriberSet
//!   Router      ──┤  (broadcast chan)
//!   Supervisor  ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; events without receivers are lost
//! - One ring buffer of `capacity` events is shared by all receivers
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receivers(&self) -> usize {
        self.tx.receiver_count()
    }
}
