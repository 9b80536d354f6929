//! Runtime events: data model and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, worker actors and runners, `Router` (dropped commands),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's listener task, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
