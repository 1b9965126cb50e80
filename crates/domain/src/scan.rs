use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a barcode came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanSource {
    /// Keystroke-wedge scanner typing into the focused input
    #[serde(rename = "HID")]
    Hid,
    Camera,
}

/// A completed scan. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub barcode: String,
    pub source: ScanSource,
    pub captured_at: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(barcode: impl Into<String>, source: ScanSource) -> Self {
        Self {
            barcode: barcode.into(),
            source,
            captured_at: Utc::now(),
        }
    }
}

/// A key as delivered by the keyboard event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    /// Modifiers, arrows, function keys...
    Other,
}

/// Key a scanner is programmed to send after each barcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminator {
    #[default]
    Enter,
    Tab,
}

impl Terminator {
    pub fn matches(&self, key: Key) -> bool {
        matches!(
            (self, key),
            (Self::Enter, Key::Enter) | (Self::Tab, Key::Tab)
        )
    }
}
