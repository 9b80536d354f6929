//! # Router delivery policies.
//!
//! Decide what [`Router::route`](crate::Router::route) does when the ideal
//! hand-off is not possible:
//!
//! ```text
//! resolve owner ──► owner slot has no live handle ──► UnavailablePolicy
//!               │                                    ├─ FailFast → NoWorkersAvailable
//!               │                                    └─ Wait     → re-resolve on registry change
//!               └─► inbox full ─────────────────────► QueueFullPolicy
//!                                                    ├─ Block    → await capacity
//!                                                    ├─ Drop     → Delivery::Dropped + CommandDropped event
//!                                                    └─ FailFast → QueueFull
//! ```
//!
//! [`Affinity`] chooses which membership forms the hash ring.

use std::time::Duration;

/// Which membership the hash ring is built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Affinity {
    /// Ring over reserved slots: a device's owner never moves while its
    /// worker restarts; commands fail (or wait) until the owner is back.
    #[default]
    Strict,
    /// Ring over live handles: keys of a missing worker move to the next
    /// worker clockwise for the duration of the gap.
    Rebalance,
}

/// What to do when the selected worker's inbox is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueFullPolicy {
    /// Wait for capacity.
    #[default]
    Block,
    /// Discard the command and report [`Delivery::Dropped`](crate::Delivery::Dropped).
    Drop,
    /// Return [`RouteError::QueueFull`](crate::RouteError::QueueFull).
    FailFast,
}

/// What to do when the owner of a key has no live handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnavailablePolicy {
    /// Return [`RouteError::NoWorkersAvailable`](crate::RouteError::NoWorkersAvailable) immediately.
    #[default]
    FailFast,
    /// Re-resolve on every registry change for up to `timeout`.
    Wait {
        /// Upper bound on the total wait.
        timeout: Duration,
    },
}

/// Router behavior bundle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub affinity: Affinity,
    pub on_full: QueueFullPolicy,
    pub on_unavailable: UnavailablePolicy,
}
