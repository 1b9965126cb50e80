//! Domain layer - Pure hardware model with no I/O
//!
//! This crate contains:
//! - Device identity and the connection lifecycle (ConnectionState)
//! - Value objects (WeightReading, ScanEvent, PrintJob)
//! - Hardware events
//! - Connection interfaces (traits) implemented by infrastructure drivers
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Label rules enforced at domain level
//! - Testable in isolation

pub mod camera;
pub mod device;
pub mod error;
pub mod event;
pub mod printer;
pub mod scan;
pub mod weight;

// Re-export commonly used types
pub use device::{ConnectionState, Device, DeviceKind, DeviceStatus};
pub use error::HardwareError;
pub use event::HardwareEvent;
pub use printer::{PrintJob, PrintOutcome};
pub use scan::{Key, ScanEvent, ScanSource, Terminator};
pub use weight::WeightReading;
