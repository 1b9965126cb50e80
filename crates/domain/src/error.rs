use thiserror::Error;

use crate::device::DeviceKind;

/// Hardware-level errors
///
/// Every variant maps to a stable kind string (see [`HardwareError::kind`]) that
/// outer layers can match on without parsing messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("{0} is not connected")]
    DeviceNotConnected(DeviceKind),

    #[error("{kind} I/O error: {message}")]
    DeviceIo { kind: DeviceKind, message: String },

    #[error("{kind} did not answer within {timeout_ms}ms")]
    Timeout { kind: DeviceKind, timeout_ms: u64 },

    #[error("Invalid label: {0}")]
    InvalidLabelSpec(String),

    #[error("No camera device available")]
    NoDeviceAvailable,

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("A camera session is already active")]
    SessionAlreadyActive,

    #[error("No active scan")]
    NoActiveScan,

    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),
}

impl HardwareError {
    pub fn io(kind: DeviceKind, message: impl Into<String>) -> Self {
        Self::DeviceIo {
            kind,
            message: message.into(),
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceNotConnected(_) => "DeviceNotConnected",
            Self::DeviceIo { .. } | Self::Timeout { .. } => "DeviceIOError",
            Self::InvalidLabelSpec(_) => "InvalidLabelSpec",
            Self::NoDeviceAvailable => "NoDeviceAvailable",
            Self::CameraUnavailable(_) => "CameraUnavailable",
            Self::SessionAlreadyActive => "SessionAlreadyActive",
            Self::NoActiveScan => "NoActiveScan",
            Self::InvalidConfig(_) => "InvalidConfig",
        }
    }

    /// Device-level failures that are worth one transparent retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DeviceIo { .. } | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, HardwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reports_as_io_error() {
        let err = HardwareError::Timeout {
            kind: DeviceKind::Scale,
            timeout_ms: 500,
        };
        assert_eq!(err.kind(), "DeviceIOError");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Scale did not answer within 500ms");
    }

    #[test]
    fn test_caller_errors_are_not_transient() {
        assert!(!HardwareError::InvalidLabelSpec("x".into()).is_transient());
        assert!(!HardwareError::DeviceNotConnected(DeviceKind::Printer).is_transient());
        assert!(!HardwareError::NoActiveScan.is_transient());
    }
}
