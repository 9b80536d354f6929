//! # Worker abstractions.
//!
//! - [`Worker`] - one incarnation of a stateful, command-consuming worker
//! - [`WorkerContext`] - identity and cancellation of an incarnation
//! - [`WorkerFactory`] - builds a fresh [`Worker`] per incarnation
//! - [`WorkerFn`] - stateless worker backed by a closure
//! - [`FactoryFn`] - factory backed by a closure

mod context;
mod factory;
mod worker;

pub use context::WorkerContext;
pub use factory::{FactoryFn, WorkerFactory, WorkerFactoryRef, WorkerFn};
pub use worker::Worker;
