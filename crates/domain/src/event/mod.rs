use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::{EventPublisher, PublishError};

use crate::device::DeviceStatus;
use crate::printer::PrintOutcome;
use crate::scan::ScanEvent;
use crate::weight::WeightReading;

/// Events that can occur on the warehouse station
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HardwareEvent {
    /// A barcode was read by the wedge scanner or the camera
    ScanCaptured {
        scan: ScanEvent,
        weight: Option<WeightReading>,
    },

    /// A device changed connection state
    ConnectionChanged {
        status: DeviceStatus,
        timestamp: DateTime<Utc>,
    },

    /// Net weight moved by more than the configured threshold
    WeightUpdated {
        device_id: String,
        reading: WeightReading,
    },

    PrintSucceeded {
        package_number: String,
        timestamp: DateTime<Utc>,
    },

    PrintFailed {
        package_number: Option<String>,
        kind: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl HardwareEvent {
    pub fn scan_captured(scan: ScanEvent, weight: Option<WeightReading>) -> Self {
        Self::ScanCaptured { scan, weight }
    }

    pub fn connection_changed(status: DeviceStatus) -> Self {
        Self::ConnectionChanged {
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn weight_updated(device_id: impl Into<String>, reading: WeightReading) -> Self {
        Self::WeightUpdated {
            device_id: device_id.into(),
            reading,
        }
    }

    pub fn print_succeeded(package_number: impl Into<String>) -> Self {
        Self::PrintSucceeded {
            package_number: package_number.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn print_failed(package_number: Option<String>, error: &crate::HardwareError) -> Self {
        Self::PrintFailed {
            package_number,
            kind: error.kind().to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Result event for a finished print job
    pub fn print_outcome(package_number: impl Into<String>, outcome: &PrintOutcome) -> Self {
        match outcome {
            PrintOutcome::Succeeded => Self::print_succeeded(package_number),
            PrintOutcome::Failed { kind, reason } => Self::PrintFailed {
                package_number: Some(package_number.into()),
                kind: kind.clone(),
                reason: reason.clone(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScanCaptured { .. } => "ScanCaptured",
            Self::ConnectionChanged { .. } => "ConnectionChanged",
            Self::WeightUpdated { .. } => "WeightUpdated",
            Self::PrintSucceeded { .. } => "PrintSucceeded",
            Self::PrintFailed { .. } => "PrintFailed",
        }
    }
}
