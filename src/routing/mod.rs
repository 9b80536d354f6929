//! # Consistent-hash routing.
//!
//! - [`RoutingHash`] pluggable hash `bytes → u64` (default [`Sha256Hash`])
//! - [`ConsistentHashRouter`] pure selection of one handle for a key over a snapshot
//! - [`Router`] the façade: fresh registry lookup + selection + hand-off per command
//!
//! ## Hash ring
//! ```text
//!            h("w-0#0")      h(key)        h("w-1#3")
//!   0 ──────────●──────────────▲──────────────●────────────── u64::MAX ─┐
//!   ▲                          └── owner = first position clockwise ──►  │
//!   └───────────────────────────── wraps ────────────────────────────────┘
//! ```
//! Every worker id owns `pool_size` positions. Removing a worker only moves the
//! keys that it owned; adding one only takes keys from its clockwise neighbours.

mod hash;
mod ring;
mod router;

pub use hash::{RoutingHash, Sha256Hash};
pub use ring::{ConsistentHashRouter, Ring};
pub use router::{Delivery, Router};
