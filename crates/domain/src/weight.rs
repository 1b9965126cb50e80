use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One weight sample, net of the tare active when it was taken.
///
/// Readings are immutable: every poll produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    pub raw_grams: f64,
    pub tare_offset: f64,
    pub timestamp: DateTime<Utc>,
}

impl WeightReading {
    pub fn new(raw_grams: f64, tare_offset: f64) -> Self {
        Self {
            raw_grams,
            tare_offset,
            timestamp: Utc::now(),
        }
    }

    /// Reported weight: raw minus tare, never negative
    pub fn net_grams(&self) -> f64 {
        (self.raw_grams - self.tare_offset).max(0.0)
    }

    pub fn net_kilograms(&self) -> f64 {
        self.net_grams() / 1000.0
    }
}
