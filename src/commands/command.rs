//! # Commands accepted by worker inboxes.
//!
//! A worker understands exactly two commands: start and stop processing the
//! data stream of a device. Both carry the [`Device`], whose id is the routing key.

use super::device::{Device, DeviceId};

/// Command routed to the worker owning a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Begin processing the device's event stream.
    Start(Device),
    /// Stop processing the device's event stream.
    Stop(Device),
}

impl Command {
    /// Returns the device this command targets.
    pub fn device(&self) -> &Device {
        match self {
            Command::Start(d) | Command::Stop(d) => d,
        }
    }

    /// Returns the key used to pick the worker.
    pub fn routing_key(&self) -> &DeviceId {
        self.device().id()
    }

    /// Returns a short stable label for logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Stop(_) => "stop",
        }
    }
}
