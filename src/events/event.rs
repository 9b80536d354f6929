//! # Runtime events emitted by the supervisor, worker actors and the router.
//!
//! [`EventKind`] falls into four groups:
//! - **Worker lifecycle**: starting, registered, failed, deregistered, backoff, stopped
//! - **Terminal**: restart budget exhausted, fatal worker error
//! - **Commands**: rejected by a worker, dropped by the router
//! - **Runtime**: shutdown progress and subscriber health
//!
//! Every event carries a global `seq` that increases monotonically; use it to
//! restore order across receivers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use routevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_worker("event-worker-pool-2")
//!     .with_incarnation(4)
//!     .with_delay(Duration::from_millis(400))
//!     .with_reason("device offline");
//!
//! assert_eq!(ev.worker.as_deref(), Some("event-worker-pool-2"));
//! assert_eq!(ev.delay_ms, Some(400));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker incarnation is starting.
    ///
    /// Sets: `worker`, `incarnation`, `attempt` (restarts so far in the streak)
    WorkerStarting,

    /// The incarnation's handle is now in the registry.
    ///
    /// Sets: `worker`, `incarnation`
    WorkerRegistered,

    /// The incarnation faulted (error, panic or kill).
    ///
    /// Sets: `worker`, `incarnation`, `reason`
    WorkerFailed,

    /// The incarnation's handle was removed from the registry.
    ///
    /// Sets: `worker`, `incarnation`, `abandoned` (commands left in the inbox)
    WorkerDeregistered,

    /// Next incarnation scheduled.
    ///
    /// Sets: `worker`, `incarnation` (the failed one), `attempt`, `delay_ms`, `reason`
    BackoffScheduled,

    /// The worker stopped gracefully (shutdown or explicit stop).
    ///
    /// Sets: `worker`, `reason`
    WorkerStopped,

    // === Terminal ===
    /// Restart budget exhausted; the slot is retired.
    ///
    /// Sets: `worker`, `attempt`, `reason`
    BudgetExhausted,

    /// The worker returned a fatal error; the slot is retired without restart.
    ///
    /// Sets: `worker`, `incarnation`, `reason`
    WorkerFatal,

    // === Commands ===
    /// A worker refused a command and kept running.
    ///
    /// Sets: `worker`, `device`, `command`, `reason`
    CommandRejected,

    /// The router discarded a command because the inbox was full.
    ///
    /// Sets: `worker`, `device`, `command`, `reason`
    CommandDropped,

    // === Runtime ===
    /// Shutdown requested (signal or explicit call).
    ShutdownRequested,

    /// Every worker stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded.
    ///
    /// Sets: `reason` (stuck workers)
    GraceExceeded,

    /// A subscriber queue was full or closed; the event was not delivered to it.
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberOverflow,

    /// A subscriber panicked while processing an event.
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberPanicked,
}

impl EventKind {
    /// Stable snake_case label.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::WorkerStarting => "worker_starting",
            EventKind::WorkerRegistered => "worker_registered",
            EventKind::WorkerFailed => "worker_failed",
            EventKind::WorkerDeregistered => "worker_deregistered",
            EventKind::BackoffScheduled => "backoff_scheduled",
            EventKind::WorkerStopped => "worker_stopped",
            EventKind::BudgetExhausted => "budget_exhausted",
            EventKind::WorkerFatal => "worker_fatal",
            EventKind::CommandRejected => "command_rejected",
            EventKind::CommandDropped => "command_dropped",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within",
            EventKind::GraceExceeded => "grace_exceeded",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,

    /// Worker slot id. Never set by subscriber events.
    pub worker: Option<Arc<str>>,
    /// Subscriber name, for `SubscriberOverflow` / `SubscriberPanicked`.
    pub subscriber: Option<&'static str>,
    /// Incarnation counter of the worker.
    pub incarnation: Option<u64>,
    /// Consecutive restarts in the current streak.
    pub attempt: Option<u32>,
    /// Backoff delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Device the command was addressed to.
    pub device: Option<Arc<str>>,
    /// Command label (`start` / `stop`).
    pub command: Option<&'static str>,
    /// Commands still queued when a worker was deregistered.
    pub abandoned: Option<u32>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            subscriber: None,
            incarnation: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            device: None,
            command: None,
            abandoned: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    #[inline]
    pub fn with_incarnation(mut self, incarnation: u64) -> Self {
        self.incarnation = Some(incarnation);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_device(mut self, device: impl Into<Arc<str>>) -> Self {
        self.device = Some(device.into());
        self
    }

    #[inline]
    pub fn with_command(mut self, label: &'static str) -> Self {
        self.command = Some(label);
        self
    }

    #[inline]
    pub fn with_abandoned(mut self, n: usize) -> Self {
        self.abandoned = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    #[inline]
    pub fn with_subscriber(mut self, name: &'static str) -> Self {
        self.subscriber = Some(name);
        self
    }

    /// Subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subscriber(subscriber)
            .with_reason(reason)
    }

    /// Subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subscriber(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarting);
        let b = Event::new(EventKind::WorkerStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_internal());
        assert_eq!(ev.subscriber, Some("log"));
        assert_eq!(ev.worker, None);
        assert_eq!(ev.reason.as_deref(), Some("full"));
        assert!(!Event::new(EventKind::CommandDropped).is_internal());
    }
}
