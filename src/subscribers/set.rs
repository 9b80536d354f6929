//! # Non-blocking fan-out to subscribers.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► sub1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► sub2.on_event()
//!     └──► [queue N] ──► worker N ──► subN.on_event()
//! ```
//!
//! ## Rules
//! - `emit()` uses `try_send` and returns immediately
//! - Per-subscriber FIFO; no ordering across subscribers
//! - A full or closed queue drops the event for that subscriber only and
//!   publishes `SubscriberOverflow`
//! - A panicking subscriber is reported via `SubscriberPanicked` and keeps running
//! - Failures while handling `SubscriberOverflow` / `SubscriberPanicked` are only
//!   logged; republishing them would feed the same subscriber again

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker task per subscriber. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()));
                    if let Err(payload) = fut.catch_unwind().await {
                        let info = panic_message(&*payload);
                        warn!(
                            target: "routevisor::subscribers",
                            subscriber = name,
                            %info,
                            kind = ev.kind.as_label(),
                            "subscriber panicked"
                        );
                        if !ev.is_internal() {
                            bus.publish(Event::subscriber_panicked(name, info));
                        }
                    }
                }
            }));
            channels.push(SubscriberChannel { name, sender: tx });
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Delivers `event` to every subscriber queue.
    pub fn emit(&self, event: Event) {
        let internal = event.is_internal();
        let event = Arc::new(event);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            warn!(
                target: "routevisor::subscribers",
                subscriber = channel.name,
                reason,
                kind = event.kind.as_label(),
                "event dropped for subscriber"
            );
            if !internal {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
