//! # WorkerActor: supervises one worker slot.
//!
//! Runs incarnations of a slot one after another, applying the restart budget
//! and backoff between them.
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► Starting: new inbox, factory.create(ctx), publish WorkerStarting
//!   ├─► run_incarnation()  (registers on Running, deregisters on exit)
//!   │     ├─ Stopped        → Stopped(Shutdown | Requested), release slot, exit
//!   │     ├─ Fatal          → Stopped(Fatal), retire slot, exit
//!   │     └─ Fault          → Failed
//!   ├─► uptime >= reset_after ? restarts = 0
//!   ├─► !restart.allows(restarts) → Stopped(BudgetExhausted), retire slot, exit
//!   └─► Restarting: publish BackoffScheduled, sleep (cancellable), restarts += 1
//! }
//! ```
//!
//! ## Rules
//! - Incarnations of one slot never overlap
//! - The incarnation counter only grows; `restarts` counts the current streak
//! - Terminal exits are logged at `error` and published as `BudgetExhausted`
//!   (budget spent) or `WorkerFatal` (fatal error)

use std::panic::AssertUnwindSafe;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::runner::{Exit, SlotEnv, run_incarnation};
use crate::core::slot::{SlotState, StopReason};
use crate::error::{WorkerError, panic_message};
use crate::events::{Event, EventKind};
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::registry::{WorkerHandle, WorkerId};
use crate::workers::{WorkerContext, WorkerFactoryRef};

/// Restart parameters of a slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ActorParams {
    pub(crate) restart: RestartPolicy,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) queue_capacity: usize,
}

pub(crate) struct WorkerActor {
    id: WorkerId,
    factory: WorkerFactoryRef,
    params: ActorParams,
    env: SlotEnv,
    /// Runtime-wide token; distinguishes shutdown from an explicit stop.
    runtime: CancellationToken,
}

impl WorkerActor {
    pub(crate) fn new(
        id: WorkerId,
        factory: WorkerFactoryRef,
        params: ActorParams,
        env: SlotEnv,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            id,
            factory,
            params,
            env,
            runtime,
        }
    }

    pub(crate) async fn run(self) {
        let mut incarnation: u64 = 0;
        let mut restarts: u32 = 0;

        loop {
            if self.env.control.token.is_cancelled() {
                self.stop_gracefully();
                return;
            }

            incarnation += 1;
            let (uptime, exit) = self.run_one(incarnation, restarts).await;

            let error = match exit {
                Exit::Stopped => {
                    self.stop_gracefully();
                    return;
                }
                Exit::Fatal(error) => {
                    let reason = StopReason::Fatal {
                        error: error.clone(),
                    };
                    self.retire(reason, incarnation, restarts, &error);
                    return;
                }
                Exit::Fault(e) => e,
            };

            self.fault(incarnation, &error);

            if self.params.restart.resets_after(uptime) {
                restarts = 0;
            }
            if !self.params.restart.allows(restarts) {
                let last_error = error.as_message();
                self.retire(
                    StopReason::BudgetExhausted {
                        restarts,
                        last_error: last_error.clone(),
                    },
                    incarnation,
                    restarts,
                    &last_error,
                );
                return;
            }

            let delay = self.params.backoff.next(restarts);
            restarts += 1;
            self.env.control.set(SlotState::Restarting { restarts, delay });
            self.env.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_worker(self.id.as_str())
                    .with_incarnation(incarnation)
                    .with_attempt(restarts)
                    .with_delay(delay)
                    .with_reason(error.as_message()),
            );
            debug!(target: "routevisor::supervisor", worker = %self.id, ?delay, restarts, "restart scheduled");

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = self.env.control.token.cancelled() => {}
            }
        }
    }

    /// Starts one incarnation and returns how long it ran and how it ended.
    async fn run_one(&self, incarnation: u64, restarts: u32) -> (std::time::Duration, Exit) {
        self.env.control.set(SlotState::Starting { incarnation });
        self.env.bus.publish(
            Event::new(EventKind::WorkerStarting)
                .with_worker(self.id.as_str())
                .with_incarnation(incarnation)
                .with_attempt(restarts),
        );

        let token = self.env.control.begin_incarnation();
        let ctx = WorkerContext::new(
            self.env.service.clone(),
            self.id.clone(),
            incarnation,
            token,
        );
        let (tx, rx) = mpsc::channel(self.params.queue_capacity);
        let handle = WorkerHandle::new(self.id.clone(), incarnation, tx);
        let started_at = Instant::now();

        let exit = match std::panic::catch_unwind(AssertUnwindSafe(|| self.factory.create(&ctx))) {
            Ok(worker) => run_incarnation(&self.env, worker, ctx, handle, rx).await,
            Err(payload) => Exit::Fault(WorkerError::Panicked {
                info: panic_message(&*payload),
            }),
        };
        self.env.control.end_incarnation();
        (started_at.elapsed(), exit)
    }

    fn fault(&self, incarnation: u64, error: &WorkerError) {
        warn!(target: "routevisor::supervisor", worker = %self.id, incarnation, error = %error, "worker fault");
        self.env.control.set(SlotState::Failed {
            incarnation,
            error: error.as_message(),
        });
        self.env.bus.publish(
            Event::new(EventKind::WorkerFailed)
                .with_worker(self.id.as_str())
                .with_incarnation(incarnation)
                .with_reason(error.as_message()),
        );
    }

    fn retire(&self, reason: StopReason, incarnation: u64, restarts: u32, last_error: &str) {
        self.env.registry.retire(&self.env.service, self.id.clone());
        error!(
            target: "routevisor::supervisor",
            service = %self.env.service,
            worker = %self.id,
            restarts,
            last_error,
            "worker stopped permanently"
        );
        let event = match reason {
            StopReason::Fatal { .. } => {
                Event::new(EventKind::WorkerFatal).with_incarnation(incarnation)
            }
            _ => Event::new(EventKind::BudgetExhausted).with_attempt(restarts),
        };
        self.env.bus.publish(
            event
                .with_worker(self.id.as_str())
                .with_reason(last_error),
        );
        self.env.control.set(SlotState::Stopped(reason));
    }

    fn stop_gracefully(&self) {
        let reason = if self.runtime.is_cancelled() {
            StopReason::Shutdown
        } else {
            StopReason::Requested
        };
        self.env.registry.release(&self.env.service, &self.id);
        self.env.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(self.id.as_str())
                .with_reason(match reason {
                    StopReason::Shutdown => "shutdown",
                    _ => "requested",
                }),
        );
        debug!(target: "routevisor::supervisor", worker = %self.id, ?reason, "worker stopped");
        self.env.control.set(SlotState::Stopped(reason));
    }
}
