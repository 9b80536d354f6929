//! # Runtime configuration.
//!
//! [`SupervisorConfig`] holds the runtime-wide settings; [`PoolConfig`] the
//! shape of the worker pool and its ring.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait on shutdown; every slot not yet stopped is reported stuck
//! - `bus_capacity = 0`, `queue_capacity = 0`, `pool_size = 0` → clamped to 1

use std::time::Duration;

use crate::policies::{BackoffPolicy, DeliveryPolicy, RestartPolicy};
use crate::registry::{ServiceKey, WorkerId};

/// Pool identity and size.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Registry key the pool's workers register under.
    pub service_key: ServiceKey,
    /// Virtual ring positions per worker.
    pub pool_size: usize,
    /// Number of worker slots spawned by `Supervisor::spawn_pool`.
    pub workers: usize,
}

impl PoolConfig {
    /// Slot id of the `index`-th pool worker: `"{service_key}-{index}"`.
    pub fn slot_id(&self, index: usize) -> WorkerId {
        WorkerId::new(format!("{}-{index}", self.service_key))
    }

    #[inline]
    pub fn pool_size_clamped(&self) -> usize {
        self.pool_size.max(1)
    }
}

impl Default for PoolConfig {
    /// `event-worker-pool`, 5 virtual positions, 5 workers.
    fn default() -> Self {
        Self {
            service_key: ServiceKey::new("event-worker-pool"),
            pool_size: 5,
            workers: 5,
        }
    }
}

/// Global configuration for the supervision runtime.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum wait for slots to stop after shutdown was requested.
    pub grace: Duration,
    /// Event bus ring buffer size.
    pub bus_capacity: usize,
    /// Capacity of each worker inbox.
    pub queue_capacity: usize,
    pub pool: PoolConfig,
    /// Restart budget applied to every slot.
    pub restart: RestartPolicy,
    /// Delay between incarnations.
    pub backoff: BackoffPolicy,
    /// Router behavior for routers created by the supervisor.
    pub delivery: DeliveryPolicy,
}

impl SupervisorConfig {
    /// Grace period as an `Option` (`None` = do not wait).
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        (self.grace > Duration::ZERO).then_some(self.grace)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `queue_capacity = 256`
    /// - `pool = PoolConfig::default()`
    /// - `restart = RestartPolicy::default()` (3 consecutive restarts, 30s reset window)
    /// - `backoff = BackoffPolicy::default()` (exponential 100ms..10s)
    /// - `delivery = DeliveryPolicy::default()` (strict affinity, block, fail fast)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            queue_capacity: 256,
            pool: PoolConfig::default(),
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            delivery: DeliveryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.grace_period(), Some(Duration::from_secs(60)));
        assert_eq!(cfg.pool.service_key.as_str(), "event-worker-pool");
        assert_eq!(cfg.pool.pool_size, 5);
        assert_eq!(cfg.pool.workers, 5);
        assert_eq!(cfg.restart.max_restarts, Some(3));
    }

    #[test]
    fn test_sentinels() {
        let cfg = SupervisorConfig {
            grace: Duration::ZERO,
            bus_capacity: 0,
            queue_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.grace_period(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.queue_capacity_clamped(), 1);
    }

    #[test]
    fn test_slot_ids() {
        let pool = PoolConfig::default();
        assert_eq!(pool.slot_id(3).as_str(), "event-worker-pool-3");
    }
}
