use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConnectionState;

/// Kind of physical peripheral behind a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Scale,
    Printer,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scale => "Scale",
            Self::Printer => "Printer",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a physical peripheral (scale, printer).
/// A Device names the *hardware*; its connection handle lives with the
/// controller that owns it, never with the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub kind: DeviceKind,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Read-only snapshot of a device's connection, published on every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub kind: DeviceKind,
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

impl DeviceStatus {
    pub fn disconnected(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            kind: device.kind,
            state: ConnectionState::Disconnected,
            last_error: None,
        }
    }
}
