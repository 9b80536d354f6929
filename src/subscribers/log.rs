//! # LogWriter: mirrors runtime events into `tracing`.
//!
//! Failures and terminal events are logged at `warn`/`error`, lifecycle at `info`,
//! routine registry churn at `debug`. Target is `routevisor::events`.
//!
//! ```text
//! INFO  worker starting        worker=event-worker-pool-1 incarnation=2 attempt=1
//! WARN  worker failed          worker=event-worker-pool-1 incarnation=2 reason="device offline"
//! INFO  backoff scheduled      worker=event-worker-pool-1 delay_ms=200 attempt=1
//! ERROR restart budget exhausted worker=event-worker-pool-1 attempt=3 reason="device offline"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "routevisor::events";

/// Structured-logging subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let device = e.device.as_deref().unwrap_or("-");
        let command = e.command.unwrap_or("-");
        let subscriber = e.subscriber.unwrap_or("-");

        match e.kind {
            EventKind::WorkerStarting => {
                info!(target: TARGET, seq = e.seq, worker, incarnation = e.incarnation, attempt = e.attempt, "worker starting");
            }
            EventKind::WorkerRegistered => {
                debug!(target: TARGET, seq = e.seq, worker, incarnation = e.incarnation, "worker registered");
            }
            EventKind::WorkerDeregistered => {
                debug!(target: TARGET, seq = e.seq, worker, incarnation = e.incarnation, abandoned = e.abandoned, "worker deregistered");
            }
            EventKind::WorkerFailed => {
                warn!(target: TARGET, seq = e.seq, worker, incarnation = e.incarnation, reason, "worker failed");
            }
            EventKind::BackoffScheduled => {
                info!(target: TARGET, seq = e.seq, worker, delay_ms = e.delay_ms, attempt = e.attempt, reason, "backoff scheduled");
            }
            EventKind::WorkerStopped => {
                info!(target: TARGET, seq = e.seq, worker, reason, "worker stopped");
            }
            EventKind::BudgetExhausted => {
                error!(target: TARGET, seq = e.seq, worker, attempt = e.attempt, reason, "restart budget exhausted");
            }
            EventKind::WorkerFatal => {
                error!(target: TARGET, seq = e.seq, worker, incarnation = e.incarnation, reason, "worker stopped on fatal error");
            }
            EventKind::CommandRejected => {
                warn!(target: TARGET, seq = e.seq, worker, device, command, reason, "command rejected");
            }
            EventKind::CommandDropped => {
                warn!(target: TARGET, seq = e.seq, worker, device, command, reason, "command dropped");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, seq = e.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: TARGET, seq = e.seq, "all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(target: TARGET, seq = e.seq, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, subscriber, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, subscriber, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
