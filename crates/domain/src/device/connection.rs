use async_trait::async_trait;

use crate::error::HardwareError;

/// Connection lifecycle that infrastructure drivers must provide
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    /// Open the underlying port/socket
    async fn connect(&mut self) -> Result<(), HardwareError>;

    /// Close the underlying port/socket
    async fn disconnect(&mut self) -> Result<(), HardwareError>;

    /// Port or address this connection talks to
    fn endpoint(&self) -> String;

    /// Point the connection at another port. Only called while disconnected.
    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), HardwareError> {
        Err(HardwareError::InvalidConfig(format!(
            "{} does not support changing its endpoint to {}",
            self.endpoint(),
            endpoint
        )))
    }
}

/// A digital scale
#[async_trait]
pub trait ScaleConnection: DeviceConnection {
    /// Read one gross weight sample, in grams
    async fn read_grams(&mut self) -> Result<f64, HardwareError>;
}

/// A label printer
#[async_trait]
pub trait PrinterConnection: DeviceConnection {
    /// Send raw bytes (ESC/POS commands) to the printer
    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), HardwareError>;
}
