use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

/// An enumerated video input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub id: String,
    pub label: String,
}

impl CameraInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    fn is_rear_facing(&self) -> bool {
        let label = self.label.to_lowercase();
        label.contains("back") || label.contains("rear")
    }
}

/// Camera enumeration and acquisition capability
#[async_trait]
pub trait CameraProvider: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<CameraInfo>, HardwareError>;

    /// Acquire the camera exclusively and return a frame decoder for it
    async fn open(&self, camera: &CameraInfo) -> Result<Box<dyn FrameDecoder>, HardwareError>;
}

/// Decodes barcodes from an open camera, one frame at a time
#[async_trait]
pub trait FrameDecoder: Send {
    /// `Ok(None)` when the frame held no readable code
    async fn decode_frame(&mut self) -> Result<Option<String>, HardwareError>;
}

/// Which camera a decode session should use
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraSelector {
    /// A "back"/"rear" labelled camera if present, otherwise the first one
    #[default]
    PreferRear,
    Id(String),
}

impl CameraSelector {
    pub fn select<'a>(&self, devices: &'a [CameraInfo]) -> Result<&'a CameraInfo, HardwareError> {
        match self {
            Self::PreferRear => devices
                .iter()
                .find(|d| d.is_rear_facing())
                .or_else(|| devices.first())
                .ok_or(HardwareError::NoDeviceAvailable),
            Self::Id(id) => devices
                .iter()
                .find(|d| &d.id == id)
                .ok_or(HardwareError::NoDeviceAvailable),
        }
    }
}
