//! Infrastructure layer - Device drivers and external integrations

pub mod camera;
pub mod config;
pub mod drivers;
pub mod messaging;
pub mod parser;
pub mod printer;

pub use camera::ScriptedCamera;
pub use config::{
    CameraConfig, PrinterConfig, PrinterType, ScaleConfig, ScaleDriver, ScannerConfig,
    WarehouseConfig,
};
pub use drivers::{DeviceFactory, MockScale};
pub use messaging::{CompositeEventPublisher, JsonLinesPublisher, TracingEventPublisher};
pub use printer::{FilePrinter, MockPrinter, NetworkPrinter};
