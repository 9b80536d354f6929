//! # Restart budget for worker slots.
//!
//! [`RestartPolicy`] bounds how many **consecutive** restarts a slot may go
//! through before it is abandoned (`Stopped`).
//!
//! ```text
//! fault ─► restarts < max_restarts ? ─ yes ─► restarts += 1, backoff, Starting
//!                                   └ no ──► Stopped(BudgetExhausted)
//! ```
//!
//! An incarnation that stayed `Running` for at least `reset_after` is considered
//! healthy: its fault starts a fresh streak (`restarts = 0`).

use std::time::Duration;

/// Bounded restart policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Maximum consecutive restarts (`None` = unbounded, `Some(0)` = never restart).
    pub max_restarts: Option<u32>,
    /// Uptime after which the consecutive-restart counter resets (`None` = never).
    pub reset_after: Option<Duration>,
}

impl RestartPolicy {
    /// Never restart: the first fault stops the slot.
    pub const fn never() -> Self {
        Self {
            max_restarts: Some(0),
            reset_after: None,
        }
    }

    /// At most `max` consecutive restarts.
    pub const fn limited(max: u32) -> Self {
        Self {
            max_restarts: Some(max),
            reset_after: None,
        }
    }

    /// Restart forever.
    pub const fn unbounded() -> Self {
        Self {
            max_restarts: None,
            reset_after: None,
        }
    }

    /// Returns a policy with an updated reset window.
    pub const fn with_reset_after(mut self, window: Option<Duration>) -> Self {
        self.reset_after = window;
        self
    }

    /// True if one more restart fits after `restarts` consecutive ones.
    #[inline]
    pub fn allows(&self, restarts: u32) -> bool {
        self.max_restarts.is_none_or(|max| restarts < max)
    }

    /// True if an incarnation that ran for `uptime` resets the streak.
    #[inline]
    pub fn resets_after(&self, uptime: Duration) -> bool {
        self.reset_after.is_some_and(|window| uptime >= window)
    }
}

impl Default for RestartPolicy {
    /// Returns `limited(3)` with a 30s reset window.
    fn default() -> Self {
        Self::limited(3).with_reset_after(Some(Duration::from_secs(30)))
    }
}
