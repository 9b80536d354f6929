//! # Example: Device Router
//!
//! Spawns a pool of five stateful workers, routes start/stop commands for a
//! handful of devices, kills the worker owning one of them and shows that the
//! same device lands on the same (restarted) slot afterwards.
//!
//! ```text
//! RUST_LOG=debug cargo run --example device_router
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use routevisor::{
    Command, Device, DeviceId, FactoryFn, SlotState, Subscribe, Supervisor, SupervisorConfig,
    Worker, WorkerContext, WorkerError,
};

/// Keeps the set of devices whose stream this incarnation is processing.
struct Sessions {
    active: HashSet<DeviceId>,
}

#[async_trait]
impl Worker for Sessions {
    async fn on_start(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        println!("[{}#{}] up", ctx.worker(), ctx.incarnation());
        Ok(())
    }

    async fn handle(&mut self, cmd: Command, ctx: &WorkerContext) -> Result<(), WorkerError> {
        match cmd {
            Command::Start(device) => {
                if !self.active.insert(device.id().clone()) {
                    return Err(WorkerError::rejected("already streaming"));
                }
                println!("[{}] start {} ({} active)", ctx.worker(), device.id(), self.active.len());
            }
            Command::Stop(device) => {
                if !self.active.remove(device.id()) {
                    return Err(WorkerError::rejected("not streaming"));
                }
                println!("[{}] stop {} ({} active)", ctx.worker(), device.id(), self.active.len());
            }
        }
        Ok(())
    }

    async fn on_stop(&mut self, ctx: &WorkerContext) {
        println!("[{}] down with {} active", ctx.worker(), self.active.len());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(routevisor::LogWriter)];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let cfg = SupervisorConfig {
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    };

    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
    let workers = sup.spawn_pool(FactoryFn::arc(|_ctx: &WorkerContext| Sessions {
        active: HashSet::new(),
    }))?;

    let key = sup.config().pool.service_key.clone();
    while sup.registry().lookup(&key).len() < workers.len() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let router = sup.router();
    let devices: Vec<Device> = (1..=8)
        .map(|i| Device::new(format!("sensor-{i}")).with_address(format!("10.0.0.{i}")))
        .collect();

    for device in &devices {
        let delivery = router.start(device.clone()).await?;
        println!("{} -> {}", device.id(), delivery.worker());
    }

    // Kill the owner of the first device and wait for its next incarnation.
    let victim = router.resolve(devices[0].id())?.id().clone();
    let mut state = sup.watch(&victim).ok_or("unknown worker")?;
    println!("killing {victim}");
    sup.kill(&victim);
    state
        .wait_for(|s| matches!(s, SlotState::Running { incarnation } if *incarnation > 1))
        .await?;

    // The restarted worker has fresh state; the device still maps to it.
    let delivery = router.start(devices[0].clone()).await?;
    println!("{} -> {} after restart", devices[0].id(), delivery.worker());
    assert_eq!(delivery.worker(), &victim);

    for device in &devices[1..] {
        router.stop(device.clone()).await?;
    }

    sup.shutdown().await?;
    Ok(())
}
