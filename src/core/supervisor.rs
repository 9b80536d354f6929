//! # Supervisor: owns the worker slots, the event plumbing and shutdown.
//!
//! ## Responsibilities
//! - spawn one `WorkerActor` per slot and reserve the slot in the [`Registry`]
//! - hand out [`Router`]s bound to the same registry and delivery policy
//! - expose slot state, `kill` and `stop_worker`
//! - fan out bus events to subscribers
//! - graceful shutdown bounded by [`SupervisorConfig::grace`]
//!
//! ## Shutdown path
//! ```text
//! shutdown()
//!   ├─► publish ShutdownRequested
//!   ├─► runtime_token.cancel()  → every slot token → every incarnation token
//!   ├─► join all actors within grace
//!   │      ├─ Ok      → publish AllStoppedWithin
//!   │      └─ timeout → publish GraceExceeded, Err(GraceExceeded { stuck })
//!   └─► stop listener, flush subscribers
//! ```
//!
//! ## Example
//! ```no_run
//! use routevisor::{Command, Device, Supervisor, SupervisorConfig, WorkerContext, WorkerFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!     sup.spawn_pool(WorkerFn::arc(|cmd: Command, ctx: WorkerContext| async move {
//!         println!("{} <- {:?}", ctx.worker(), cmd);
//!         Ok::<_, routevisor::WorkerError>(())
//!     }))?;
//!
//!     let router = sup.router();
//!     router.start(Device::new("d1")).await?;
//!     router.stop(Device::new("d1")).await?;
//!
//!     sup.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::actor::{ActorParams, WorkerActor};
use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::runner::SlotEnv;
use crate::core::shutdown;
use crate::core::slot::{SlotControl, SlotState};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::registry::{Registry, WorkerId};
use crate::routing::{Router, RoutingHash};
use crate::subscribers::SubscriberSet;
use crate::workers::WorkerFactoryRef;

struct Slot {
    control: Arc<SlotControl>,
    join: Option<JoinHandle<()>>,
}

struct Listener {
    stop: CancellationToken,
    join: JoinHandle<()>,
}

/// Supervises a pool of device workers.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    registry: Arc<Registry>,
    hasher: Arc<dyn RoutingHash>,
    runtime_token: CancellationToken,
    slots: RwLock<HashMap<WorkerId, Slot>>,
    listener: Mutex<Option<Listener>>,
}

impl Supervisor {
    /// Returns a builder.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        registry: Arc<Registry>,
        hasher: Arc<dyn RoutingHash>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry,
            hasher,
            runtime_token,
            slots: RwLock::new(HashMap::new()),
            listener: Mutex::new(None),
        }
    }

    /// Forwards bus events to `subs` until shutdown completes.
    pub(crate) fn spawn_listener(&self, subs: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(target: "routevisor::supervisor", skipped = n, "event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stopped.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            subs.emit(ev);
                        }
                        break;
                    }
                }
            }
            subs.shutdown().await;
        });
        *self.listener.lock() = Some(Listener { stop, join });
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Registry the pool registers in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Receiver for runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// A router over this supervisor's pool.
    pub fn router(&self) -> Router {
        Router::new(
            self.cfg.pool.service_key.clone(),
            self.cfg.pool.pool_size_clamped(),
            Arc::clone(&self.registry),
        )
        .with_hasher(Arc::clone(&self.hasher))
        .with_policy(self.cfg.delivery)
        .with_bus(self.bus.clone())
    }

    /// Spawns `pool.workers` slots named `"{service_key}-{i}"`.
    pub fn spawn_pool(&self, factory: WorkerFactoryRef) -> Result<Vec<WorkerId>, RuntimeError> {
        let ids: Vec<WorkerId> = (0..self.cfg.pool.workers)
            .map(|i| self.cfg.pool.slot_id(i))
            .collect();
        for id in &ids {
            self.spawn_worker(id.clone(), Arc::clone(&factory))?;
        }
        info!(
            target: "routevisor::supervisor",
            service = %self.cfg.pool.service_key,
            workers = ids.len(),
            pool_size = self.cfg.pool.pool_size_clamped(),
            "pool spawned"
        );
        Ok(ids)
    }

    /// Spawns one supervised slot.
    ///
    /// A slot that reached `Stopped` may be spawned again under the same id.
    pub fn spawn_worker(&self, id: WorkerId, factory: WorkerFactoryRef) -> Result<(), RuntimeError> {
        let mut slots = self.slots.write();
        if slots
            .get(&id)
            .is_some_and(|slot| !slot.control.state().is_stopped())
        {
            return Err(RuntimeError::WorkerExists { worker: id });
        }

        let service = self.cfg.pool.service_key.clone();
        self.registry.reserve(&service, id.clone());

        let control = Arc::new(SlotControl::new(self.runtime_token.child_token()));
        let actor = WorkerActor::new(
            id.clone(),
            factory,
            ActorParams {
                restart: self.cfg.restart,
                backoff: self.cfg.backoff,
                queue_capacity: self.cfg.queue_capacity_clamped(),
            },
            SlotEnv {
                service,
                registry: Arc::clone(&self.registry),
                bus: self.bus.clone(),
                control: Arc::clone(&control),
            },
            self.runtime_token.clone(),
        );

        let join = tokio::spawn(actor.run());
        slots.insert(
            id,
            Slot {
                control,
                join: Some(join),
            },
        );
        Ok(())
    }

    /// Sorted ids of all known slots (stopped ones included).
    pub fn workers(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.slots.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Current state of a slot.
    pub fn state(&self, id: &WorkerId) -> Option<SlotState> {
        self.slots.read().get(id).map(|slot| slot.control.state())
    }

    /// Receiver observing every state transition of a slot.
    pub fn watch(&self, id: &WorkerId) -> Option<watch::Receiver<SlotState>> {
        self.slots.read().get(id).map(|slot| slot.control.watch())
    }

    /// Terminates the slot's live incarnation; the actor treats it as a fault.
    ///
    /// Returns `false` if the slot is unknown or has no live incarnation.
    pub fn kill(&self, id: &WorkerId) -> bool {
        self.slots
            .read()
            .get(id)
            .is_some_and(|slot| slot.control.kill())
    }

    /// Stops a slot gracefully and releases its reservation.
    ///
    /// Returns `false` if the slot is unknown or already stopping.
    pub fn stop_worker(&self, id: &WorkerId) -> bool {
        match self.slots.read().get(id) {
            Some(slot) if !slot.control.token.is_cancelled() => {
                slot.control.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Stops every slot and waits up to `grace` for them.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        info!(target: "routevisor::supervisor", grace = ?self.cfg.grace, "shutdown requested");
        self.runtime_token.cancel();

        let joins: Vec<JoinHandle<()>> = self
            .slots
            .write()
            .values_mut()
            .filter_map(|slot| slot.join.take())
            .collect();
        let all = join_all(joins);

        let done = match self.cfg.grace_period() {
            Some(grace) => tokio::time::timeout(grace, all).await.is_ok(),
            None => all.now_or_never().is_some(),
        };

        let res = if done {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            let stuck = self.stuck();
            self.bus.publish(
                Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
            );
            warn!(target: "routevisor::supervisor", ?stuck, "grace exceeded");
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        };

        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.stop.cancel();
            let _ = listener.join.await;
        }
        res
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        match shutdown::wait_for_signal().await {
            Ok(signal) => info!(target: "routevisor::supervisor", signal, "signal received"),
            Err(e) => warn!(target: "routevisor::supervisor", error = %e, "signal handler unavailable"),
        }
        self.shutdown().await
    }

    fn stuck(&self) -> Vec<String> {
        let mut stuck: Vec<String> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| !slot.control.state().is_stopped())
            .map(|(id, _)| id.to_string())
            .collect();
        stuck.sort_unstable();
        stuck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, Device};
    use crate::core::config::PoolConfig;
    use crate::core::slot::StopReason;
    use crate::error::{RouteError, WorkerError};
    use crate::policies::{BackoffPolicy, RestartPolicy};
    use crate::registry::{SlotMark, WorkerHandle};
    use crate::routing::Delivery;
    use crate::subscribers::Subscribe;
    use crate::workers::{FactoryFn, Worker, WorkerContext, WorkerFn};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Journal = Arc<Mutex<Vec<(String, Command)>>>;

    fn cfg(restart: RestartPolicy) -> SupervisorConfig {
        SupervisorConfig {
            restart,
            backoff: BackoffPolicy::fixed(Duration::from_millis(10)),
            grace: Duration::from_secs(1),
            ..SupervisorConfig::default()
        }
    }

    fn journaling(journal: &Journal) -> WorkerFactoryRef {
        let journal = Arc::clone(journal);
        WorkerFn::arc(move |cmd: Command, ctx: WorkerContext| {
            let journal = Arc::clone(&journal);
            async move {
                if cmd.routing_key().as_str() == "poison" {
                    return Err(WorkerError::fatal("poisoned"));
                }
                journal.lock().push((ctx.worker().to_string(), cmd));
                Ok::<_, WorkerError>(())
            }
        })
    }

    async fn wait_registered(sup: &Supervisor, n: usize) {
        let key = sup.config().pool.service_key.clone();
        while sup.registry().lookup(&key).len() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn wait_journal(journal: &Journal, n: usize) {
        while journal.lock().len() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn single(restart: RestartPolicy) -> SupervisorConfig {
        SupervisorConfig {
            pool: PoolConfig {
                workers: 1,
                ..PoolConfig::default()
            },
            ..cfg(restart)
        }
    }

    fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    async fn wait_state(sup: &Supervisor, id: &WorkerId, f: impl FnMut(&SlotState) -> bool) {
        let mut rx = sup.watch(id).unwrap();
        rx.wait_for(f).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_of_five_keeps_device_affinity_and_order() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::default())).build();
        let ids = sup.spawn_pool(journaling(&journal)).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0].as_str(), "event-worker-pool-0");
        wait_registered(&sup, 5).await;

        let router = sup.router();
        let a = router.start(Device::new("d1")).await.unwrap();
        let b = router.stop(Device::new("d1")).await.unwrap();
        assert_eq!(a.worker(), b.worker());

        wait_journal(&journal, 2).await;
        let seen = journal.lock().clone();
        assert_eq!(
            seen,
            vec![
                (a.worker().to_string(), Command::Start(Device::new("d1"))),
                (a.worker().to_string(), Command::Stop(Device::new("d1"))),
            ]
        );
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pool_returns_no_workers() {
        let sup = Supervisor::builder(SupervisorConfig::default()).build();
        let err = sup.router().start(Device::new("d1")).await.unwrap_err();
        assert!(matches!(err, RouteError::NoWorkersAvailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_killed_worker_recovers_with_same_affinity() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::default())).build();
        sup.spawn_pool(journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;

        let router = sup.router();
        let Delivery::Delivered { worker, incarnation } =
            router.start(Device::new("d1")).await.unwrap()
        else {
            panic!("expected delivery");
        };
        assert_eq!(incarnation, 1);

        assert!(sup.kill(&worker));
        wait_state(&sup, &worker, |s| {
            matches!(s, SlotState::Running { incarnation: 2 })
        })
        .await;

        let again = router.stop(Device::new("d1")).await.unwrap();
        assert_eq!(
            again,
            Delivery::Delivered {
                worker: worker.clone(),
                incarnation: 2
            }
        );
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_retires_slot() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::limited(2))).build();
        sup.spawn_pool(journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;

        let router = sup.router();
        let owner = router.resolve(&"d1".into()).unwrap().id().clone();
        let mut events = sup.subscribe();

        for incarnation in 1..=3 {
            wait_state(&sup, &owner, |s| {
                *s == SlotState::Running { incarnation }
            })
            .await;
            assert!(sup.kill(&owner));
        }
        wait_state(&sup, &owner, SlotState::is_stopped).await;

        assert!(matches!(
            sup.state(&owner),
            Some(SlotState::Stopped(StopReason::BudgetExhausted { restarts: 2, .. }))
        ));
        let snap = sup.registry().lookup(&sup.config().pool.service_key);
        assert!(snap.get(&owner).is_none());
        assert_eq!(snap.len(), 4);
        assert_eq!(
            router.start(Device::new("d1")).await.unwrap_err(),
            RouteError::RestartBudgetExhausted {
                worker: owner.clone()
            }
        );

        let mut exhausted = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::BudgetExhausted {
                assert_eq!(ev.worker.as_deref(), Some(owner.as_str()));
                exhausted = true;
            }
        }
        assert!(exhausted);
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_retires_without_restart() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::unbounded())).build();
        sup.spawn_pool(journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;

        let router = sup.router();
        let mut events = sup.subscribe();
        let owner = router.start(Device::new("poison")).await.unwrap().worker().clone();
        wait_state(&sup, &owner, SlotState::is_stopped).await;

        let events = drain(&mut events);
        assert!(events.iter().any(|e| {
            e.kind == EventKind::WorkerFatal && e.worker.as_deref() == Some(owner.as_str())
        }));
        assert!(!events.iter().any(|e| e.kind == EventKind::BudgetExhausted));

        assert_eq!(
            sup.state(&owner),
            Some(SlotState::Stopped(StopReason::Fatal {
                error: "poisoned".into()
            }))
        );
        assert!(matches!(
            router.stop(Device::new("poison")).await,
            Err(RouteError::RestartBudgetExhausted { .. })
        ));
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_worker_releases_slot() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::default())).build();
        sup.spawn_pool(journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;

        let router = sup.router();
        let owner = router.resolve(&"d1".into()).unwrap().id().clone();
        assert!(sup.stop_worker(&owner));
        assert!(!sup.stop_worker(&owner));
        wait_state(&sup, &owner, SlotState::is_stopped).await;

        assert_eq!(
            sup.state(&owner),
            Some(SlotState::Stopped(StopReason::Requested))
        );
        let snap = sup.registry().lookup(&sup.config().pool.service_key);
        assert_eq!(snap.slot(&owner), None);
        let moved = router.start(Device::new("d1")).await.unwrap();
        assert_ne!(moved.worker(), &owner);

        sup.spawn_worker(owner.clone(), journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;
        assert_eq!(router.resolve(&"d1".into()).unwrap().id(), &owner);
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_worker_is_rejected() {
        let journal = Journal::default();
        let sup = Supervisor::builder(SupervisorConfig::default()).build();
        let id = WorkerId::new("w-0");
        sup.spawn_worker(id.clone(), journaling(&journal)).unwrap();
        assert!(matches!(
            sup.spawn_worker(id.clone(), journaling(&journal)),
            Err(RuntimeError::WorkerExists { .. })
        ));
        assert_eq!(sup.workers(), vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_every_slot() {
        let journal = Journal::default();
        let sup = Supervisor::builder(cfg(RestartPolicy::default())).build();
        let ids = sup.spawn_pool(journaling(&journal)).unwrap();
        wait_registered(&sup, 5).await;
        let mut events = sup.subscribe();

        sup.shutdown().await.unwrap();

        for id in &ids {
            assert_eq!(sup.state(id), Some(SlotState::Stopped(StopReason::Shutdown)));
        }
        assert!(sup.registry().services().is_empty());
        let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds.first(), Some(&EventKind::ShutdownRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }

    struct Stubborn;

    #[async_trait]
    impl Worker for Stubborn {
        async fn handle(&mut self, _cmd: Command, _ctx: &WorkerContext) -> Result<(), WorkerError> {
            Ok(())
        }

        async fn on_stop(&mut self, _ctx: &WorkerContext) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_exceeded_lists_stuck_slots() {
        let sup = Supervisor::builder(SupervisorConfig {
            grace: Duration::from_millis(100),
            pool: PoolConfig {
                workers: 1,
                ..PoolConfig::default()
            },
            ..SupervisorConfig::default()
        })
        .build();
        sup.spawn_pool(crate::workers::FactoryFn::arc(|_: &WorkerContext| Stubborn))
            .unwrap();
        wait_registered(&sup, 1).await;

        match sup.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec!["event-worker-pool-0".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Fails `on_start` with `error` while it is set.
    struct FlakyStart {
        error: Option<WorkerError>,
    }

    #[async_trait]
    impl Worker for FlakyStart {
        async fn on_start(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
            match self.error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn handle(&mut self, _cmd: Command, _ctx: &WorkerContext) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_start_failure_restarts_without_registering() {
        let sup = Supervisor::builder(single(RestartPolicy::default())).build();
        let mut events = sup.subscribe();
        let ids = sup
            .spawn_pool(FactoryFn::arc(|ctx: &WorkerContext| FlakyStart {
                error: (ctx.incarnation() == 1).then(|| WorkerError::fail("device offline")),
            }))
            .unwrap();
        let id = &ids[0];
        wait_state(&sup, id, |s| *s == SlotState::Running { incarnation: 2 }).await;

        let events = drain(&mut events);
        let registered: Vec<Option<u64>> = events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerRegistered)
            .map(|e| e.incarnation)
            .collect();
        assert_eq!(registered, vec![Some(2)]);
        assert!(events.iter().any(|e| {
            e.kind == EventKind::WorkerFailed && e.incarnation == Some(1)
        }));
        assert!(!events.iter().any(|e| e.kind == EventKind::WorkerDeregistered));

        let snap = sup.registry().lookup(&sup.config().pool.service_key);
        assert_eq!(snap.get(id).map(WorkerHandle::incarnation), Some(2));
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_on_start_retires_slot() {
        let sup = Supervisor::builder(single(RestartPolicy::unbounded())).build();
        let mut events = sup.subscribe();
        let ids = sup
            .spawn_pool(FactoryFn::arc(|_: &WorkerContext| FlakyStart {
                error: Some(WorkerError::fatal("bad firmware")),
            }))
            .unwrap();
        let id = &ids[0];
        wait_state(&sup, id, SlotState::is_stopped).await;

        assert_eq!(
            sup.state(id),
            Some(SlotState::Stopped(StopReason::Fatal {
                error: "bad firmware".into()
            }))
        );
        let snap = sup.registry().lookup(&sup.config().pool.service_key);
        assert_eq!(snap.slot(id), Some(SlotMark::Retired));
        assert!(snap.get(id).is_none());

        let events = drain(&mut events);
        let starts = events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerStarting)
            .count();
        assert_eq!(starts, 1);
        assert!(!events.iter().any(|e| e.kind == EventKind::WorkerRegistered));
        assert!(events.iter().any(|e| e.kind == EventKind::WorkerFatal));
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_factory_panic_is_a_fault() {
        let sup = Supervisor::builder(single(RestartPolicy::default())).build();
        let mut events = sup.subscribe();
        let ids = sup
            .spawn_pool(FactoryFn::arc(|ctx: &WorkerContext| {
                if ctx.incarnation() == 1 {
                    panic!("factory exploded");
                }
                FlakyStart { error: None }
            }))
            .unwrap();
        let id = &ids[0];
        wait_state(&sup, id, |s| *s == SlotState::Running { incarnation: 2 }).await;

        let failed = drain(&mut events)
            .into_iter()
            .find(|e| e.kind == EventKind::WorkerFailed)
            .unwrap();
        assert_eq!(failed.incarnation, Some(1));
        assert_eq!(failed.reason.as_deref(), Some("panic: factory exploded"));
        sup.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_uptime_resets_restart_budget() {
        let restart = RestartPolicy::limited(1).with_reset_after(Some(Duration::from_secs(5)));
        let sup = Supervisor::builder(single(restart)).build();
        let ids = sup.spawn_pool(journaling(&Journal::default())).unwrap();
        let id = &ids[0];

        // Three kills against a budget of one: every run after the first is long enough to reset it.
        for incarnation in 1..=3 {
            wait_state(&sup, id, |s| *s == SlotState::Running { incarnation }).await;
            if incarnation > 1 {
                tokio::time::sleep(Duration::from_secs(6)).await;
            }
            assert!(sup.kill(id));
        }
        wait_state(&sup, id, |s| *s == SlotState::Running { incarnation: 4 }).await;

        // A short run keeps the streak: the next kill exhausts the budget.
        assert!(sup.kill(id));
        wait_state(&sup, id, SlotState::is_stopped).await;
        assert!(matches!(
            sup.state(id),
            Some(SlotState::Stopped(StopReason::BudgetExhausted { restarts: 1, .. }))
        ));
        sup.shutdown().await.unwrap();
    }

    #[derive(Default)]
    struct AlwaysPanics {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for AlwaysPanics {
        async fn on_event(&self, _event: &Event) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("subscriber broken");
        }
        fn name(&self) -> &'static str {
            "always-panics"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_subscriber_settles() {
        let sub = Arc::new(AlwaysPanics::default());
        let sup = Supervisor::builder(SupervisorConfig::default())
            .with_subscribers(vec![sub.clone() as Arc<dyn Subscribe>])
            .build();

        sup.bus.publish(Event::new(EventKind::WorkerStarting));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The event itself, then the panic report; the second panic is only logged.
        assert_eq!(sub.calls.load(Ordering::SeqCst), 2);
        sup.shutdown().await.unwrap();
    }
}
