use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::config::SupervisorConfig;
use crate::core::supervisor::Supervisor;
use crate::events::Bus;
use crate::registry::Registry;
use crate::routing::{RoutingHash, Sha256Hash};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Supervisor`].
///
/// ```no_run
/// use std::sync::Arc;
/// use routevisor::{Registry, Supervisor, SupervisorConfig};
///
/// # #[tokio::main] async fn main() {
/// let registry = Registry::new();
/// let sup = Supervisor::builder(SupervisorConfig::default())
///     .with_registry(Arc::clone(&registry))
///     .build();
/// # let _ = sup; }
/// ```
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry: Option<Arc<Registry>>,
    hasher: Arc<dyn RoutingHash>,
}

impl SupervisorBuilder {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            registry: None,
            hasher: Arc::new(Sha256Hash),
        }
    }

    /// Sets event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses an existing registry (several supervisors may share one).
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the routing hash used by routers created from the supervisor.
    pub fn with_hasher(mut self, hasher: Arc<dyn RoutingHash>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Builds the supervisor and starts its event listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let registry = self.registry.unwrap_or_default();

        let sup = Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            registry,
            self.hasher,
            CancellationToken::new(),
        ));
        sup.spawn_listener(subs);
        sup
    }
}
