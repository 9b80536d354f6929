//! Supervision runtime.
//!
//! The public surface is [`Supervisor`] (with [`SupervisorBuilder`]), its
//! configuration and the observable [`SlotState`].
//!
//! Internal modules:
//! - `actor`: restart loop of one slot (budget, backoff, retire);
//! - `runner`: drives one incarnation (register, inbox, deregister);
//! - `slot`: state machine and control block shared with the supervisor;
//! - `shutdown`: OS signal handling.
//!
//! ## Wiring
//! ```text
//! SupervisorBuilder::build()
//!   ├─► Bus ──► listener task ──► SubscriberSet
//!   ├─► Registry (shared, or supplied)
//!   └─► Supervisor
//!         spawn_pool(factory)
//!           └─► for i in 0..workers:
//!                 registry.reserve("{service}-{i}")
//!                 tokio::spawn(WorkerActor::run)   token: runtime → slot → incarnation
//!         router() ──► Router over the same Registry
//! ```

mod actor;
mod builder;
mod config;
mod runner;
mod shutdown;
mod slot;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{PoolConfig, SupervisorConfig};
pub use slot::{SlotState, StopReason};
pub use supervisor::Supervisor;
