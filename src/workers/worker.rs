//! # Worker trait.
//!
//! A worker owns the per-device state of every device routed to it. The
//! supervisor builds a fresh value per incarnation, so state does not survive
//! a restart unless the factory restores it.

use async_trait::async_trait;

use crate::commands::Command;
use crate::error::WorkerError;
use crate::workers::WorkerContext;

/// # One incarnation of a pool worker.
///
/// Commands are delivered one at a time, in inbox order.
///
/// | result of a hook / `handle`  | effect                                        |
/// |------------------------------|-----------------------------------------------|
/// | `Ok(())`                     | next command                                  |
/// | `Err(Rejected)`              | `CommandRejected` event, next command         |
/// | `Err(Fail)` or a panic       | fault: deregistered, restarted within budget  |
/// | `Err(Fatal)`                 | slot stopped and retired                      |
///
/// # Example
/// ```
/// use std::collections::HashSet;
/// use async_trait::async_trait;
/// use routevisor::{Command, DeviceId, Worker, WorkerContext, WorkerError};
///
/// #[derive(Default)]
/// struct Sessions {
///     active: HashSet<DeviceId>,
/// }
///
/// #[async_trait]
/// impl Worker for Sessions {
///     async fn handle(&mut self, cmd: Command, _ctx: &WorkerContext) -> Result<(), WorkerError> {
///         match cmd {
///             Command::Start(device) => {
///                 if !self.active.insert(device.id().clone()) {
///                     return Err(WorkerError::rejected("already started"));
///                 }
///             }
///             Command::Stop(device) => {
///                 self.active.remove(device.id());
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + 'static {
    /// Runs before the incarnation is registered. An error is a fault.
    async fn on_start(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Processes one command.
    async fn handle(&mut self, cmd: Command, ctx: &WorkerContext) -> Result<(), WorkerError>;

    /// Runs after the incarnation was deregistered on a graceful stop.
    async fn on_stop(&mut self, _ctx: &WorkerContext) {}
}
