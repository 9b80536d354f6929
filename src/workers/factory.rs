//! # Worker factories.
//!
//! The supervisor asks its [`WorkerFactory`] for a fresh [`Worker`] every time
//! a slot starts an incarnation. Two closure adapters cover the common cases:
//!
//! - [`WorkerFn`]: the worker *is* a closure `Fn(Command, WorkerContext) -> Fut`
//!   (no per-incarnation state; share state through `Arc` captures)
//! - [`FactoryFn`]: a closure `Fn(&WorkerContext) -> W` that builds a stateful `W: Worker`
//!
//! ## Example
//! ```rust
//! use routevisor::{Command, WorkerContext, WorkerError, WorkerFactoryRef, WorkerFn};
//!
//! let factory: WorkerFactoryRef = WorkerFn::arc(|cmd: Command, ctx: WorkerContext| async move {
//!     if ctx.is_cancelled() {
//!         return Err(WorkerError::Canceled);
//!     }
//!     println!("{} handles {}", ctx.worker(), cmd.routing_key());
//!     Ok::<_, WorkerError>(())
//! });
//! # let _ = factory;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::Command;
use crate::error::WorkerError;
use crate::workers::{Worker, WorkerContext};

/// Builds one [`Worker`] per incarnation.
pub trait WorkerFactory: Send + Sync + 'static {
    fn create(&self, ctx: &WorkerContext) -> Box<dyn Worker>;
}

/// Shared factory handle.
pub type WorkerFactoryRef = Arc<dyn WorkerFactory>;

/// Closure-backed stateless worker.
pub struct WorkerFn<F> {
    f: Arc<F>,
}

impl<F, Fut> WorkerFn<F>
where
    F: Fn(Command, WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }

    /// Creates the adapter as a shared factory.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

struct FnWorker<F> {
    f: Arc<F>,
}

#[async_trait]
impl<F, Fut> Worker for FnWorker<F>
where
    F: Fn(Command, WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn handle(&mut self, cmd: Command, ctx: &WorkerContext) -> Result<(), WorkerError> {
        (self.f)(cmd, ctx.clone()).await
    }
}

impl<F, Fut> WorkerFactory for WorkerFn<F>
where
    F: Fn(Command, WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn create(&self, _ctx: &WorkerContext) -> Box<dyn Worker> {
        Box::new(FnWorker {
            f: Arc::clone(&self.f),
        })
    }
}

/// Closure-backed factory for stateful workers.
pub struct FactoryFn<F> {
    f: F,
}

impl<F, W> FactoryFn<F>
where
    F: Fn(&WorkerContext) -> W + Send + Sync + 'static,
    W: Worker,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, W> WorkerFactory for FactoryFn<F>
where
    F: Fn(&WorkerContext) -> W + Send + Sync + 'static,
    W: Worker,
{
    fn create(&self, ctx: &WorkerContext) -> Box<dyn Worker> {
        Box::new((self.f)(ctx))
    }
}
