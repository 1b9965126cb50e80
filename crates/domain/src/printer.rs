use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

/// A package label to print. `weight` is in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub package_number: String,
    pub order_number: String,
    pub sequence: u32,
    pub total: u32,
    pub description: String,
    pub weight: f64,
}

impl PrintJob {
    /// Check label content before anything is sent to the device
    pub fn validate(&self) -> Result<(), HardwareError> {
        if self.package_number.trim().is_empty() {
            return Err(HardwareError::InvalidLabelSpec(
                "package_number is required".to_string(),
            ));
        }
        if self.order_number.trim().is_empty() {
            return Err(HardwareError::InvalidLabelSpec(
                "order_number is required".to_string(),
            ));
        }
        if self.sequence < 1 || self.total < 1 {
            return Err(HardwareError::InvalidLabelSpec(format!(
                "sequence and total must be at least 1 (got {}/{})",
                self.sequence, self.total
            )));
        }
        if self.sequence > self.total {
            return Err(HardwareError::InvalidLabelSpec(format!(
                "sequence {} exceeds total {}",
                self.sequence, self.total
            )));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(HardwareError::InvalidLabelSpec(format!(
                "weight must be a non-negative number (got {})",
                self.weight
            )));
        }
        Ok(())
    }
}

/// Terminal state of a print job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum PrintOutcome {
    Succeeded,
    Failed { kind: String, reason: String },
}

impl PrintOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<Result<(), HardwareError>> for PrintOutcome {
    fn from(result: Result<(), HardwareError>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(e) => Self::Failed {
                kind: e.kind().to_string(),
                reason: e.to_string(),
            },
        }
    }
}
