//! Application layer - Device controllers and station workflows

pub mod device;
pub mod orchestrator;
pub mod printer;
pub mod scale;
pub mod scanner;
pub mod service;

pub use device::{DeviceCommandSerializer, DeviceLink};
pub use orchestrator::{PrintRequest, ScanView, WarehouseOrchestrator};
pub use printer::{LabelBuilder, PrinterController, PrinterSettings};
pub use scale::{ScaleController, ScaleSettings};
pub use scanner::{
    CameraDecodeSession, CameraSessionHandle, DisambiguatorConfig, KeyEvent, KeystrokeDisambiguator,
    SessionOutcome,
};
pub use service::{ErrorBody, HardwareService, PackageLabelRequest, ScaleConnectRequest};
