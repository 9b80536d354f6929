//! Error types used by the routevisor runtime, the router and workers.
//!
//! This module defines three enums:
//!
//! - [`RouteError`] returned to callers of the [`Router`](crate::Router).
//! - [`WorkerError`] returned by [`Worker`](crate::Worker) implementations.
//! - [`RuntimeError`] raised by the supervision runtime itself.
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use std::time::Duration;
use thiserror::Error;

use crate::registry::{ServiceKey, WorkerId};

/// # Errors returned by the router façade.
///
/// Only [`RouteError::RestartBudgetExhausted`] is permanent; the other variants
/// are transient and the caller may retry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No live worker can take the command right now (empty pool, or the
    /// owning worker is between deregistration and re-registration).
    #[error("no workers available for service {service}")]
    NoWorkersAvailable {
        /// Service whose pool was consulted.
        service: ServiceKey,
    },

    /// The worker slot owning this key exhausted its restart budget (or died
    /// with a fatal error) and will not come back without operator action.
    #[error("worker {worker} is stopped: restart budget exhausted")]
    RestartBudgetExhausted {
        /// Retired slot.
        worker: WorkerId,
    },

    /// The selected worker's inbox is full and the delivery policy is fail-fast.
    #[error("inbox of worker {worker} is full")]
    QueueFull {
        /// Worker whose inbox rejected the command.
        worker: WorkerId,
    },
}

impl RouteError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use routevisor::{RouteError, ServiceKey};
    ///
    /// let err = RouteError::NoWorkersAvailable { service: ServiceKey::new("pool") };
    /// assert_eq!(err.as_label(), "route_no_workers");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RouteError::NoWorkersAvailable { .. } => "route_no_workers",
            RouteError::RestartBudgetExhausted { .. } => "route_budget_exhausted",
            RouteError::QueueFull { .. } => "route_queue_full",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RouteError::NoWorkersAvailable { service } => format!("no workers: {service}"),
            RouteError::RestartBudgetExhausted { worker } => {
                format!("budget exhausted: {worker}")
            }
            RouteError::QueueFull { worker } => format!("queue full: {worker}"),
        }
    }

    /// Indicates whether retrying the same call later may succeed.
    ///
    /// # Example
    /// ```
    /// use routevisor::{RouteError, WorkerId};
    ///
    /// let err = RouteError::RestartBudgetExhausted { worker: WorkerId::new("w-3") };
    /// assert!(!err.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RouteError::NoWorkersAvailable { .. } | RouteError::QueueFull { .. }
        )
    }
}

/// # Errors produced by a worker incarnation.
///
/// `Fail` and `Panicked` are faults: the slot restarts within its budget.
/// `Fatal` stops the slot without restart. `Rejected` only refuses one command.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WorkerError {
    /// Worker failed but a fresh incarnation may succeed.
    #[error("worker failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error (should not be restarted).
    #[error("fatal error (no restart): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Worker declined a single command; the incarnation keeps running.
    #[error("command rejected: {reason}")]
    Rejected {
        /// Why the command was declined.
        reason: String,
    },

    /// Worker code panicked.
    #[error("worker panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// Incarnation was cancelled (kill, stop or shutdown).
    #[error("worker cancelled")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkerError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        WorkerError::Fatal {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        WorkerError::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Rejected { .. } => "worker_rejected",
            WorkerError::Panicked { .. } => "worker_panicked",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error } => format!("error: {error}"),
            WorkerError::Fatal { error } => format!("fatal: {error}"),
            WorkerError::Rejected { reason } => format!("rejected: {reason}"),
            WorkerError::Panicked { info } => format!("panic: {info}"),
            WorkerError::Canceled => "cancelled".to_string(),
        }
    }

    /// Indicates whether the slot may be restarted after this error.
    ///
    /// # Example
    /// ```
    /// use routevisor::WorkerError;
    ///
    /// assert!(WorkerError::fail("boom").is_retryable());
    /// assert!(!WorkerError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Fail { .. } | WorkerError::Panicked { .. } | WorkerError::Canceled
        )
    }
}

/// Extracts a readable message from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// # Errors produced by the supervision runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some slots did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Slots that had not reached `Stopped`.
        stuck: Vec<String>,
    },

    /// A slot with this id is already supervised.
    #[error("worker {worker} already exists")]
    WorkerExists {
        /// Duplicate slot id.
        worker: WorkerId,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use routevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::WorkerExists { .. } => "runtime_worker_exists",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::WorkerExists { worker } => format!("duplicate worker: {worker}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_error_transience() {
        let svc = ServiceKey::new("pool");
        assert!(RouteError::NoWorkersAvailable { service: svc }.is_transient());
        assert!(
            RouteError::QueueFull {
                worker: WorkerId::new("w-0")
            }
            .is_transient()
        );
        assert!(
            !RouteError::RestartBudgetExhausted {
                worker: WorkerId::new("w-0")
            }
            .is_transient()
        );
    }

    #[test]
    fn test_worker_error_labels() {
        assert_eq!(WorkerError::fail("x").as_label(), "worker_failed");
        assert_eq!(WorkerError::rejected("x").as_label(), "worker_rejected");
        assert!(!WorkerError::rejected("x").is_retryable());
        assert!(
            WorkerError::Panicked {
                info: "boom".into()
            }
            .is_retryable()
        );
    }
}
