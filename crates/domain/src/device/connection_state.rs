use serde::{Deserialize, Serialize};

/// Connection state for a serial/USB-class peripheral
///
/// ```text
/// Disconnected --connect--> Connecting --ok--> Connected
///                           Connecting --fail--> Disconnected
/// Connected --io error--> Reconnecting --ok--> Connected
///                         Reconnecting --exhausted--> Error
/// Error --connect--> Connecting
/// any --disconnect--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected, no active connection attempt
    #[default]
    Disconnected,
    /// Currently attempting to establish connection
    Connecting,
    /// Successfully connected and operational
    Connected,
    /// Recovering automatically after an I/O failure
    Reconnecting,
    /// Reconnection gave up (requires a manual connect)
    Error,
}

impl ConnectionState {
    /// Check if state allows a manual connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }

    /// Commands (read weight, tare, print) are only accepted while connected
    pub fn accepts_commands(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected | Self::Error => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected or Error state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting | Self::Reconnecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting or Reconnecting state"),
        }
    }

    /// Transition to reconnecting state
    pub fn to_reconnecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connected => Ok(Self::Reconnecting),
            _ => Err("Can only start reconnecting from Connected state"),
        }
    }

    /// Transition to error state once reconnection is exhausted
    pub fn to_error(&self) -> Result<Self, &'static str> {
        match self {
            Self::Reconnecting => Ok(Self::Error),
            _ => Err("Can only give up from Reconnecting state"),
        }
    }

    /// Transition to disconnected state (always allowed)
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }
}
