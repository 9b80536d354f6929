//! Restart, backoff and delivery policies.
//!
//! This module groups the knobs that control **if/when** a worker slot is
//! restarted, **how long** to wait between incarnations, and **what the router
//! does** when a command cannot be handed off right away.
//!
//! ## Contents
//! - [`RestartPolicy`]  bounded restart budget (max restarts / reset window)
//! - [`BackoffPolicy`]  none / fixed / exponential delays (+ [`JitterPolicy`])
//! - [`DeliveryPolicy`] router behavior: [`Affinity`], [`QueueFullPolicy`], [`UnavailablePolicy`]
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart, backoff, delivery, .. }
//!      ├─► core::actor::WorkerActor uses:
//!      │     - restart.allows(restarts) to decide restart vs Stopped
//!      │     - backoff.next(restarts) to schedule the next incarnation
//!      └─► routing::Router uses delivery on every route() call
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::default()` → max 3 consecutive restarts, counter reset after 30s of healthy run.
//! - `BackoffPolicy::default()` → exponential, first=100ms, factor=2.0, max=10s, no jitter.
//! - `DeliveryPolicy::default()` → strict affinity, block on full inbox, fail fast when unavailable.

mod backoff;
mod delivery;
mod restart;

pub use backoff::{BackoffPolicy, JitterPolicy};
pub use delivery::{Affinity, DeliveryPolicy, QueueFullPolicy, UnavailablePolicy};
pub use restart::RestartPolicy;
