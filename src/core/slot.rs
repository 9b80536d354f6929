//! # Slot state machine and per-slot control block.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!        Starting ──► Running ──► Failed ──► Restarting ────┘
//!            │           │          │
//!            │           │          └──► Stopped(BudgetExhausted | Fatal)
//!            └───────────┴─────────────► Stopped(Shutdown | Requested)
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why a slot reached `Stopped`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Supervisor shutdown.
    Shutdown,
    /// `Supervisor::stop_worker`.
    Requested,
    /// Too many consecutive faults.
    BudgetExhausted { restarts: u32, last_error: String },
    /// The worker returned `WorkerError::Fatal`.
    Fatal { error: String },
}

/// Observable state of one worker slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Starting { incarnation: u64 },
    Running { incarnation: u64 },
    Failed { incarnation: u64, error: String },
    Restarting { restarts: u32, delay: Duration },
    Stopped(StopReason),
}

impl SlotState {
    pub fn is_running(&self) -> bool {
        matches!(self, SlotState::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SlotState::Stopped(_))
    }

    /// True when the slot will not come back (retired in the registry).
    pub fn is_retired(&self) -> bool {
        matches!(
            self,
            SlotState::Stopped(StopReason::BudgetExhausted { .. } | StopReason::Fatal { .. })
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            SlotState::Starting { .. } => "starting",
            SlotState::Running { .. } => "running",
            SlotState::Failed { .. } => "failed",
            SlotState::Restarting { .. } => "restarting",
            SlotState::Stopped(_) => "stopped",
        }
    }
}

/// Shared between a slot's actor and the supervisor.
pub(crate) struct SlotControl {
    state: watch::Sender<SlotState>,
    /// Cancels the whole slot (stop or shutdown).
    pub(crate) token: CancellationToken,
    /// Token of the live incarnation, if any.
    current: Mutex<Option<CancellationToken>>,
}

impl SlotControl {
    pub(crate) fn new(token: CancellationToken) -> Self {
        let (state, _rx) = watch::channel(SlotState::Starting { incarnation: 1 });
        Self {
            state,
            token,
            current: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, state: SlotState) {
        self.state.send_replace(state);
    }

    pub(crate) fn state(&self) -> SlotState {
        self.state.borrow().clone()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<SlotState> {
        self.state.subscribe()
    }

    /// Derives and records the token of a new incarnation.
    pub(crate) fn begin_incarnation(&self) -> CancellationToken {
        let token = self.token.child_token();
        *self.current.lock() = Some(token.clone());
        token
    }

    pub(crate) fn end_incarnation(&self) {
        self.current.lock().take();
    }

    /// Cancels the live incarnation only. Returns `false` if none is live.
    pub(crate) fn kill(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_only_touches_incarnation() {
        let ctl = SlotControl::new(CancellationToken::new());
        assert!(!ctl.kill());

        let inc = ctl.begin_incarnation();
        assert!(ctl.kill());
        assert!(inc.is_cancelled());
        assert!(!ctl.token.is_cancelled());
        assert!(!ctl.kill());
    }

    #[test]
    fn test_stop_cancels_incarnation() {
        let ctl = SlotControl::new(CancellationToken::new());
        let inc = ctl.begin_incarnation();
        ctl.token.cancel();
        assert!(inc.is_cancelled());
    }

    #[tokio::test]
    async fn test_watch_sees_transitions() {
        let ctl = SlotControl::new(CancellationToken::new());
        let mut rx = ctl.watch();
        ctl.set(SlotState::Running { incarnation: 1 });
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_running());
        assert!(SlotState::Stopped(StopReason::Fatal { error: "x".into() }).is_retired());
        assert!(!SlotState::Stopped(StopReason::Requested).is_retired());
    }
}
