use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Device identifier; the routing key of every command for that device.
///
/// Cheap to clone (`Arc<str>`), compared and hashed by value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(Arc<str>);

impl DeviceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes fed to the routing hash.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A device whose data stream a worker processes.
///
/// Only the id matters to routing; `address` is carried for the worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    id: DeviceId,
    address: Option<Arc<str>>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            address: None,
        }
    }

    /// Attaches a network address (e.g. the device IP).
    pub fn with_address(mut self, address: impl Into<Arc<str>>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl From<&str> for Device {
    fn from(id: &str) -> Self {
        Device::new(id)
    }
}
