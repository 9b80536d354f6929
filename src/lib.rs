//! # routevisor
//!
//! **Routevisor** routes device commands to a supervised pool of stateful
//! workers. All commands for one device land on the same worker (session
//! affinity) while workers fail, restart and re-register underneath.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── start(device) / stop(device) ──►┌──────────────────────────┐
//!                                             │ Router                   │
//!                                             │ 1. registry.lookup(svc)  │
//!                                             │ 2. ring.owner(device.id) │
//!                                             │ 3. inbox.send(command)   │
//!                                             └─────┬──────────────┬─────┘
//!                                        lookup     │              │ hand-off
//!                                                   ▼              ▼
//! ┌───────────────────────────────────────┐   ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │ Registry                              │   │ inbox 0  │  │ inbox 1  │  │ inbox N  │
//! │ ServiceKey → Snapshot {               │   └────┬─────┘  └────┬─────┘  └────┬─────┘
//! │   handles (live incarnations),        │        ▼             ▼             ▼
//! │   slots   (reserved / retired ids) }  │   ┌──────────┐  ┌──────────┐  ┌──────────┐
//! └───────────────────▲───────────────────┘   │ Worker   │  │ Worker   │  │ Worker   │
//!                     │ register/deregister   └────▲─────┘  └────▲─────┘  └────▲─────┘
//!                     │ reserve/retire             │ one incarnation at a time │
//! ┌───────────────────┴───────────────────────────┴──────────────┴─────────────┴──────┐
//! │ Supervisor: one WorkerActor per slot (restart budget, backoff, events)            │
//! └───────────────────────────────────────┬───────────────────────────────────────────┘
//!                                         ▼
//!                              Bus ──► listener ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Slot lifecycle
//! ```text
//! Starting ──► Running ──► Failed ──► Restarting ──► Starting ...
//!  │ on_start   │ registered  │ deregistered   │ backoff
//!  │            │             └─ budget spent ─► Stopped(BudgetExhausted)  (retired)
//!  │            └─ Fatal ────────────────────► Stopped(Fatal)            (retired)
//!  └────────────┴─ stop / shutdown ──────────► Stopped(Requested | Shutdown)
//! ```
//!
//! ## Features
//! | Area            | Description                                                 | Key types                                   |
//! |-----------------|-------------------------------------------------------------|---------------------------------------------|
//! | **Routing**     | Consistent hashing with virtual positions, fresh lookups    | [`Router`], [`ConsistentHashRouter`]        |
//! | **Registry**    | Concurrent directory of live handles and reserved slots     | [`Registry`], [`Snapshot`]                  |
//! | **Supervision** | Restart budget, backoff, kill/stop, graceful shutdown       | [`Supervisor`], [`SlotState`]               |
//! | **Workers**     | Stateful command handlers, built per incarnation            | [`Worker`], [`WorkerFactory`], [`WorkerFn`] |
//! | **Policies**    | Restart, backoff and delivery knobs                         | [`RestartPolicy`], [`DeliveryPolicy`]       |
//! | **Events**      | Runtime events and subscribers                              | [`Event`], [`Subscribe`]                    |
//! | **Errors**      | Typed errors for callers, workers and the runtime           | [`RouteError`], [`WorkerError`]             |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which mirrors every event into `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use routevisor::{Command, Device, Supervisor, SupervisorConfig, WorkerContext, WorkerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn routevisor::Subscribe>> = vec![Arc::new(routevisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn routevisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let workers = sup.spawn_pool(WorkerFn::arc(|cmd: Command, ctx: WorkerContext| async move {
//!         println!("{} handles {:?}", ctx.worker(), cmd);
//!         Ok::<_, routevisor::WorkerError>(())
//!     }))?;
//!     assert_eq!(workers.len(), 5);
//!
//!     let key = sup.config().pool.service_key.clone();
//!     while sup.registry().lookup(&key).len() < workers.len() {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     let router = sup.router();
//!     let first = router.start(Device::new("d1")).await?;
//!     let second = router.stop(Device::new("d1")).await?;
//!     assert_eq!(first.worker(), second.worker());
//!
//!     sup.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod commands;
mod core;
mod error;
mod events;
mod policies;
mod registry;
mod routing;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use commands::{Command, Device, DeviceId};
pub use core::{PoolConfig, SlotState, StopReason, Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{RouteError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{
    Affinity, BackoffPolicy, DeliveryPolicy, JitterPolicy, QueueFullPolicy, RestartPolicy,
    UnavailablePolicy,
};
pub use registry::{Registry, ServiceKey, SlotMark, Snapshot, WorkerHandle, WorkerId};
pub use routing::{ConsistentHashRouter, Delivery, Ring, Router, RoutingHash, Sha256Hash};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{FactoryFn, Worker, WorkerContext, WorkerFactory, WorkerFactoryRef, WorkerFn};

// Structured-logging subscriber.
// Enabled by the default `logging` feature.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
