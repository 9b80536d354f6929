//! # Drive one worker incarnation.
//!
//! ```text
//! on_start() ── Err / panic ──────────────────────────────► Exit::Fault
//!     │ Ok
//!     ▼
//! register(handle), Running
//!     │
//!     loop select {
//!       token cancelled ───► deregister ──► slot cancelled ? on_stop, Exit::Stopped
//!       │                                               : Exit::Fault(Canceled)   (kill)
//!       inbox.recv() ──► handle(cmd)
//!                          ├─ Ok            → next
//!                          ├─ Rejected      → CommandRejected, next
//!                          ├─ Fatal         → deregister, Exit::Fatal
//!                          └─ Fail / panic  → deregister, Exit::Fault
//!     }
//! ```
//!
//! ## Rules
//! - The handle is registered only after `on_start` succeeded
//! - Every way out of `Running` deregisters before returning
//! - An in-flight command is abandoned when the incarnation is cancelled; commands
//!   still queued are counted in `WorkerDeregistered.abandoned` and dropped

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::commands::Command;
use crate::core::slot::{SlotControl, SlotState};
use crate::error::{WorkerError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::registry::{Registry, ServiceKey, WorkerHandle};
use crate::workers::{Worker, WorkerContext};

/// How an incarnation ended.
#[derive(Debug)]
pub(crate) enum Exit {
    /// Slot cancelled (stop or shutdown); `on_stop` ran.
    Stopped,
    /// Restartable fault.
    Fault(WorkerError),
    /// Non-restartable error.
    Fatal(String),
}

/// Everything an incarnation touches besides its worker.
pub(crate) struct SlotEnv {
    pub(crate) service: ServiceKey,
    pub(crate) registry: Arc<Registry>,
    pub(crate) bus: Bus,
    pub(crate) control: Arc<SlotControl>,
}

/// Awaits a worker hook, turning a panic into [`WorkerError::Panicked`].
pub(crate) async fn guarded<F>(fut: F) -> Result<(), WorkerError>
where
    F: Future<Output = Result<(), WorkerError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(WorkerError::Panicked {
            info: panic_message(&*payload),
        }),
    }
}

/// Runs `worker` until it faults or its token is cancelled.
pub(crate) async fn run_incarnation(
    env: &SlotEnv,
    mut worker: Box<dyn Worker>,
    ctx: WorkerContext,
    handle: WorkerHandle,
    mut inbox: mpsc::Receiver<Command>,
) -> Exit {
    let token = ctx.token().clone();

    let started = tokio::select! {
        biased;
        _ = token.cancelled() => Err(WorkerError::Canceled),
        res = guarded(worker.on_start(&ctx)) => res,
    };
    if let Err(e) = started {
        return match e {
            WorkerError::Canceled if env.control.token.is_cancelled() => Exit::Stopped,
            WorkerError::Fatal { error } => Exit::Fatal(error),
            other => Exit::Fault(other),
        };
    }

    env.registry.register(&env.service, handle.clone());
    env.control.set(SlotState::Running {
        incarnation: ctx.incarnation(),
    });
    env.bus.publish(
        Event::new(EventKind::WorkerRegistered)
            .with_worker(ctx.worker().as_str())
            .with_incarnation(ctx.incarnation()),
    );
    debug!(target: "routevisor::worker", worker = %ctx.worker(), incarnation = ctx.incarnation(), "registered");

    let exit = loop {
        let cmd = tokio::select! {
            biased;
            _ = token.cancelled() => break None,
            cmd = inbox.recv() => match cmd {
                Some(cmd) => cmd,
                None => break Some(Exit::Fault(WorkerError::fail("inbox closed"))),
            },
        };

        let device = cmd.routing_key().clone();
        let label = cmd.as_label();
        let res = tokio::select! {
            biased;
            _ = token.cancelled() => break None,
            res = guarded(worker.handle(cmd, &ctx)) => res,
        };

        match res {
            Ok(()) => {}
            Err(WorkerError::Rejected { reason }) => {
                warn!(target: "routevisor::worker", worker = %ctx.worker(), device = %device, command = label, %reason, "command rejected");
                env.bus.publish(
                    Event::new(EventKind::CommandRejected)
                        .with_worker(ctx.worker().as_str())
                        .with_device(device.as_str())
                        .with_command(label)
                        .with_reason(reason),
                );
            }
            Err(WorkerError::Fatal { error }) => break Some(Exit::Fatal(error)),
            Err(e) => break Some(Exit::Fault(e)),
        }
    };

    deregister(env, &ctx, &handle, inbox.len());
    drop(inbox);

    match exit {
        Some(exit) => exit,
        None if env.control.token.is_cancelled() => {
            let _ = AssertUnwindSafe(worker.on_stop(&ctx)).catch_unwind().await;
            Exit::Stopped
        }
        None => Exit::Fault(WorkerError::Canceled),
    }
}

fn deregister(env: &SlotEnv, ctx: &WorkerContext, handle: &WorkerHandle, abandoned: usize) {
    if env.registry.deregister(&env.service, handle) {
        env.bus.publish(
            Event::new(EventKind::WorkerDeregistered)
                .with_worker(ctx.worker().as_str())
                .with_incarnation(ctx.incarnation())
                .with_abandoned(abandoned),
        );
        debug!(target: "routevisor::worker", worker = %ctx.worker(), incarnation = ctx.incarnation(), abandoned, "deregistered");
    }
}
