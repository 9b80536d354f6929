//! # Router: the externally visible entry point.
//!
//! Resolves the owner of a device with a **fresh** registry lookup per call,
//! then hands the command to the owner's inbox.
//!
//! ## Flow
//! ```text
//! route(cmd)
//!   loop {
//!     ├─► snapshot = registry.lookup(service)          (never cached)
//!     ├─► owner = ring(snapshot).owner(cmd.device.id)  (Affinity::Strict / Rebalance)
//!     │     ├─ retired owner        ─► Err(RestartBudgetExhausted)
//!     │     └─ no live owner        ─► UnavailablePolicy (fail / wait for registry change)
//!     └─► hand_off(handle, cmd)                        (QueueFullPolicy)
//!           ├─ delivered            ─► Ok(Delivered)
//!           ├─ inbox closed (stale) ─► re-resolve (bounded), then treat as unavailable
//!           └─ inbox full           ─► block / Ok(Dropped) / Err(QueueFull)
//!   }
//! ```
//!
//! ## Rules
//! - No state beyond configuration; clones share the registry and are safe to use concurrently
//! - Commands for one device from one caller keep their order while no restart happens
//! - A command is never dropped without the caller being told

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::commands::{Command, Device, DeviceId};
use crate::error::RouteError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Affinity, DeliveryPolicy, QueueFullPolicy, UnavailablePolicy};
use crate::registry::{Registry, ServiceKey, SlotMark, WorkerHandle, WorkerId};
use crate::routing::hash::RoutingHash;
use crate::routing::ring::ConsistentHashRouter;

/// Consecutive stale-handle hits tolerated before reporting the owner unavailable.
const MAX_STALE_RETRIES: u32 = 3;

/// Outcome of a successful [`Router::route`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Command is in the worker's inbox.
    Delivered {
        worker: WorkerId,
        incarnation: u64,
    },
    /// Inbox was full and the policy said drop; a `CommandDropped` event was published.
    Dropped { worker: WorkerId },
}

impl Delivery {
    /// Worker the command was addressed to.
    pub fn worker(&self) -> &WorkerId {
        match self {
            Delivery::Delivered { worker, .. } | Delivery::Dropped { worker } => worker,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

/// Hand-off failure that needs another resolution round.
enum HandOff {
    Closed(Command),
    Full(WorkerId),
}

/// Device command router over one service's worker pool.
#[derive(Clone)]
pub struct Router {
    service: ServiceKey,
    ring: ConsistentHashRouter,
    registry: Arc<Registry>,
    policy: DeliveryPolicy,
    bus: Option<Bus>,
}

impl Router {
    /// Creates a router with the default hash and delivery policy.
    pub fn new(service: ServiceKey, pool_size: usize, registry: Arc<Registry>) -> Self {
        Self {
            service,
            ring: ConsistentHashRouter::with_default_hash(pool_size),
            registry,
            policy: DeliveryPolicy::default(),
            bus: None,
        }
    }

    /// Replaces the routing hash.
    pub fn with_hasher(mut self, hasher: Arc<dyn RoutingHash>) -> Self {
        self.ring = ConsistentHashRouter::new(self.ring.pool_size(), hasher);
        self
    }

    /// Replaces the delivery policy.
    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Publishes `CommandDropped` events to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn service_key(&self) -> &ServiceKey {
        &self.service
    }

    pub fn pool_size(&self) -> usize {
        self.ring.pool_size()
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Routes `Start(device)`.
    pub async fn start(&self, device: Device) -> Result<Delivery, RouteError> {
        self.route(Command::Start(device)).await
    }

    /// Routes `Stop(device)`.
    pub async fn stop(&self, device: Device) -> Result<Delivery, RouteError> {
        self.route(Command::Stop(device)).await
    }

    /// Routes one command to the worker owning its device.
    pub async fn route(&self, mut cmd: Command) -> Result<Delivery, RouteError> {
        let deadline = match self.policy.on_unavailable {
            UnavailablePolicy::FailFast => None,
            UnavailablePolicy::Wait { timeout } => Some(Instant::now() + timeout),
        };
        let mut changes = self.registry.subscribe();
        let mut stale = 0u32;

        loop {
            changes.borrow_and_update();

            let err = match self.resolve(cmd.routing_key()) {
                Ok(handle) => match self.hand_off(&handle, cmd).await {
                    Ok(delivery) => return Ok(delivery),
                    Err(HandOff::Full(worker)) => return Err(RouteError::QueueFull { worker }),
                    Err(HandOff::Closed(returned)) => {
                        cmd = returned;
                        stale += 1;
                        if stale < MAX_STALE_RETRIES {
                            tokio::task::yield_now().await;
                            continue;
                        }
                        self.unavailable()
                    }
                },
                Err(e @ RouteError::NoWorkersAvailable { .. }) => e,
                Err(e) => return Err(e),
            };

            let Some(deadline) = deadline else {
                return Err(err);
            };
            match time::timeout_at(deadline, changes.changed()).await {
                Ok(Ok(())) => stale = 0,
                _ => return Err(err),
            }
        }
    }

    /// Resolves the handle that should receive a command for `key` right now.
    pub fn resolve(&self, key: &DeviceId) -> Result<WorkerHandle, RouteError> {
        let snap = self.registry.lookup(&self.service);

        if self.policy.affinity == Affinity::Rebalance || snap.slots().is_empty() {
            return self.ring.select(&snap, key);
        }

        let ring = self.ring.ring(snap.slots().iter().map(|(id, _)| id));
        let Some(owner) = ring.owner(key) else {
            return Err(self.unavailable());
        };
        if let Some(handle) = snap.get(owner) {
            return Ok(handle.clone());
        }
        match snap.slot(owner) {
            Some(SlotMark::Retired) => Err(RouteError::RestartBudgetExhausted {
                worker: owner.clone(),
            }),
            _ => Err(self.unavailable()),
        }
    }

    async fn hand_off(&self, handle: &WorkerHandle, cmd: Command) -> Result<Delivery, HandOff> {
        let worker = handle.id().clone();
        let incarnation = handle.incarnation();
        let device = cmd.routing_key().clone();
        let label = cmd.as_label();

        match self.policy.on_full {
            QueueFullPolicy::Block => {
                if let Err(e) = handle.inbox().send(cmd).await {
                    return Err(HandOff::Closed(e.0));
                }
            }
            QueueFullPolicy::Drop | QueueFullPolicy::FailFast => {
                match handle.inbox().try_send(cmd) {
                    Ok(()) => {}
                    Err(TrySendError::Closed(cmd)) => return Err(HandOff::Closed(cmd)),
                    Err(TrySendError::Full(_)) if self.policy.on_full == QueueFullPolicy::Drop => {
                        if let Some(bus) = &self.bus {
                            bus.publish(
                                Event::new(EventKind::CommandDropped)
                                    .with_worker(worker.as_str())
                                    .with_device(device.as_str())
                                    .with_command(label)
                                    .with_reason("inbox_full"),
                            );
                        }
                        return Ok(Delivery::Dropped { worker });
                    }
                    Err(TrySendError::Full(_)) => return Err(HandOff::Full(worker)),
                }
            }
        }

        debug!(
            target: "routevisor::router",
            service = %self.service,
            device = %device,
            command = label,
            worker = %worker,
            incarnation,
            "command routed"
        );
        Ok(Delivery::Delivered {
            worker,
            incarnation,
        })
    }

    fn unavailable(&self) -> RouteError {
        RouteError::NoWorkersAvailable {
            service: self.service.clone(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("service", &self.service)
            .field("pool_size", &self.ring.pool_size())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
