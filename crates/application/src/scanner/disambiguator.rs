//! Separates barcode-scanner bursts from human typing on a shared keyboard
//! stream.
//!
//! A HID scanner "types" a whole barcode in a few milliseconds and ends it
//! with a terminator key. A person is much slower. Keystrokes whose gap to
//! the previous key stays under the threshold belong to the same burst; a
//! longer gap throws the buffered characters away.

use std::time::Duration;

use domain::{Key, ScanEvent, ScanSource, Terminator};
use infrastructure::ScannerConfig;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DisambiguatorConfig {
    pub gap_threshold: Duration,
    pub terminator: Terminator,
    /// Bursts shorter than this are discarded at the terminator
    pub min_length: usize,
    /// Buffers growing past this are treated as typing and discarded
    pub max_length: Option<usize>,
}

impl Default for DisambiguatorConfig {
    fn default() -> Self {
        Self {
            gap_threshold: Duration::from_millis(100),
            terminator: Terminator::Enter,
            min_length: 1,
            max_length: None,
        }
    }
}

impl From<&ScannerConfig> for DisambiguatorConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            gap_threshold: Duration::from_millis(config.gap_threshold_ms),
            terminator: config.terminator,
            min_length: config.min_length,
            max_length: config.max_length,
        }
    }
}

/// One keystroke with the time it was observed. `at` is measured from any
/// fixed origin; only differences matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub at: Duration,
}

impl KeyEvent {
    pub fn new(key: Key, at: Duration) -> Self {
        Self { key, at }
    }
}

/// Characters of the burst in progress plus the instant it goes stale
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeystrokeBuffer {
    chars: String,
    deadline: Option<Duration>,
    overflowed: bool,
}

impl KeystrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Apply one keystroke. Returns the next buffer and, on a terminator
    /// that closes a valid burst, the completed barcode.
    pub fn step(
        mut self,
        key: Key,
        at: Duration,
        config: &DisambiguatorConfig,
    ) -> (Self, Option<String>) {
        if self.deadline.is_some_and(|deadline| at >= deadline) {
            self = Self::default();
        }

        if config.terminator.matches(key) {
            let burst = std::mem::take(&mut self.chars);
            let complete = !self.overflowed && burst.chars().count() >= config.min_length.max(1);
            return (Self::default(), complete.then_some(burst));
        }

        self.deadline = Some(at.saturating_add(config.gap_threshold));

        if let Key::Char(c) = key {
            if !c.is_control() && !self.overflowed {
                self.chars.push(c);
                if config
                    .max_length
                    .is_some_and(|max| self.chars.chars().count() > max)
                {
                    self.chars.clear();
                    self.overflowed = true;
                }
            }
        }

        (self, None)
    }

    /// Drop a burst whose deadline passed with no further keystroke
    pub fn expire(self, now: Duration) -> Self {
        match self.deadline {
            Some(deadline) if now >= deadline => Self::default(),
            _ => self,
        }
    }
}

/// Stateful wrapper around [`KeystrokeBuffer`] for the input loop
#[derive(Debug, Default)]
pub struct KeystrokeDisambiguator {
    buffer: KeystrokeBuffer,
    config: DisambiguatorConfig,
}

impl KeystrokeDisambiguator {
    pub fn new(config: DisambiguatorConfig) -> Self {
        Self {
            buffer: KeystrokeBuffer::new(),
            config,
        }
    }

    pub fn config(&self) -> &DisambiguatorConfig {
        &self.config
    }

    /// Characters buffered for the burst in progress
    pub fn pending(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn feed(&mut self, event: KeyEvent) -> Option<ScanEvent> {
        let buffer = std::mem::take(&mut self.buffer);
        let (buffer, barcode) = buffer.step(event.key, event.at, &self.config);
        self.buffer = buffer;

        barcode.map(|barcode| {
            debug!(barcode = %barcode, "Scanner burst completed");
            ScanEvent::new(barcode, ScanSource::Hid)
        })
    }

    pub fn expire(&mut self, now: Duration) {
        let buffer = std::mem::take(&mut self.buffer);
        self.buffer = buffer.expire(now);
    }
}
