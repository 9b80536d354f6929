//! # Event subscribers.
//!
//! ```text
//!   WorkerActor / Router ── publish(Event) ──► Bus ──► supervisor listener
//!                                                          │
//!                                                    SubscriberSet::emit
//!                                                ┌─────────┼─────────┐
//!                                                ▼         ▼         ▼
//!                                            LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing a subscriber
//! ```no_run
//! use routevisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct DropCounter;
//!
//! #[async_trait]
//! impl Subscribe for DropCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::CommandDropped {
//!             // bump a counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "drop-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
