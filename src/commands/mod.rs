//! # Device commands.
//!
//! - [`Command`] the tagged variant delivered to worker inboxes
//! - [`Device`] the target of a command
//! - [`DeviceId`] the routing key hashed onto the ring

mod command;
mod device;

pub use command::Command;
pub use device::{Device, DeviceId};
