mod connection;
mod connection_state;
mod entity;

pub use connection::{DeviceConnection, PrinterConnection, ScaleConnection};
pub use connection_state::ConnectionState;
pub use entity::{Device, DeviceKind, DeviceStatus};
