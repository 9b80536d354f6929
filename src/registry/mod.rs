//! # Service registry.
//!
//! Process-wide directory of live workers, grouped by [`ServiceKey`].
//!
//! ## Architecture
//! ```text
//! slot actor ── register(key, handle) ──►┐
//! slot actor ── deregister(key, handle) ─┤
//! supervisor ── reserve/retire/release ──┤
//!                                        ▼
//!                     RwLock<HashMap<ServiceKey, Snapshot>>   (copy-on-write)
//!                                        │
//! Router ◄──────── lookup(key) ──────────┘   (Arc clone, never torn)
//! ```
//!
//! ## Rules
//! - Every mutation builds a new [`Snapshot`] and swaps it in under the write lock
//! - Readers clone an `Arc` under the read lock; they never wait on a writer
//!   longer than the swap itself
//! - Every effective mutation bumps a generation counter observable via
//!   [`Registry::subscribe`]
//! - No validation: registering under the wrong key is the caller's problem

mod directory;
mod handle;
mod keys;

pub use directory::{Registry, SlotMark, Snapshot};
pub use handle::WorkerHandle;
pub use keys::{ServiceKey, WorkerId};
