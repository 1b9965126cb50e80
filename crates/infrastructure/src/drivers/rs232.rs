use std::io;
use std::time::Duration;

use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, ScaleConnection};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::parser::ScaleParser;

/// Upper bound on buffered bytes without a line terminator
const MAX_PENDING_BYTES: usize = 4096;

/// RS232 scale configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rs232Config {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "None", "Even", "Odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sent before each read for scales that only answer on request (e.g. "W\r\n").
    /// Continuous-output scales leave this empty.
    #[serde(default)]
    pub request_command: Option<String>,
}

pub(crate) fn default_baud_rate() -> u32 {
    9600
}
pub(crate) fn default_data_bits() -> u8 {
    8
}
pub(crate) fn default_parity() -> String {
    "None".to_string()
}
pub(crate) fn default_stop_bits() -> u8 {
    1
}
fn default_timeout_ms() -> u64 {
    1000
}

impl Rs232Config {
    pub fn new(port: String) -> Self {
        Self {
            port,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            timeout_ms: default_timeout_ms(),
            request_command: None,
        }
    }

    fn to_parity(&self) -> Result<tokio_serial::Parity, HardwareError> {
        match self.parity.as_str() {
            "None" => Ok(tokio_serial::Parity::None),
            "Even" => Ok(tokio_serial::Parity::Even),
            "Odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(HardwareError::InvalidConfig(format!(
                "Invalid parity: {}",
                self.parity
            ))),
        }
    }

    fn to_stop_bits(&self) -> Result<tokio_serial::StopBits, HardwareError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(HardwareError::InvalidConfig(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            ))),
        }
    }

    fn to_data_bits(&self) -> Result<tokio_serial::DataBits, HardwareError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(HardwareError::InvalidConfig(format!(
                "Invalid data bits: {}",
                self.data_bits
            ))),
        }
    }

    /// Normalize port name for Windows (e.g., COM7 -> \\.\COM7)
    fn native_port_name(&self) -> String {
        if cfg!(target_os = "windows") && !self.port.to_uppercase().starts_with(r"\\.\") {
            format!(r"\\.\{}", self.port)
        } else {
            self.port.clone()
        }
    }
}

/// Splits a serial byte stream into CR/LF terminated lines
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES {
            // Garbage without terminators (wrong baud rate); keep the tail only
            let excess = self.pending.len() - MAX_PENDING_BYTES;
            self.pending.drain(..excess);
        }
    }

    /// Next complete, non-empty line
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self
                .pending
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')?;
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..pos]).trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    /// Newest complete line currently buffered, dropping older ones
    pub fn latest_line(&mut self) -> Option<String> {
        let mut latest = None;
        while let Some(line) = self.next_line() {
            latest = Some(line);
        }
        latest
    }

    /// Read from `stream` until at least one full line is available
    pub async fn read_line<S>(&mut self, stream: &mut S) -> io::Result<String>
    where
        S: AsyncRead + Unpin,
    {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.latest_line() {
                return Ok(line);
            }
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial stream closed",
                ));
            }
            self.push(&chunk[..n]);
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Decode one scale line into grams
pub fn grams_from_line(parser: &ScaleParser, line: &str) -> Result<f64, HardwareError> {
    let reading = parser
        .parse(line)
        .map_err(|e| HardwareError::io(DeviceKind::Scale, format!("'{}': {}", line, e)))?;
    if !reading.stable {
        tracing::debug!(line = %line, "Scale reports unstable weight");
    }
    reading
        .grams()
        .map_err(|e| HardwareError::io(DeviceKind::Scale, e.to_string()))
}

/// Serial (RS232 / USB-serial) scale
pub struct Rs232Scale {
    config: Rs232Config,
    port: Option<SerialStream>,
    framer: LineFramer,
    parser: ScaleParser,
}

impl Rs232Scale {
    pub fn new(config: Rs232Config) -> Self {
        Self {
            config,
            port: None,
            framer: LineFramer::new(),
            parser: ScaleParser::new(),
        }
    }
}

#[async_trait]
impl DeviceConnection for Rs232Scale {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        if self.config.port.is_empty() {
            return Err(HardwareError::InvalidConfig(
                "No serial port configured for scale".into(),
            ));
        }
        let port_name = self.config.native_port_name();

        tracing::debug!(
            port = %port_name,
            baud_rate = self.config.baud_rate,
            "Opening serial port"
        );

        let port = tokio_serial::new(&port_name, self.config.baud_rate)
            .data_bits(self.config.to_data_bits()?)
            .parity(self.config.to_parity()?)
            .stop_bits(self.config.to_stop_bits()?)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .open_native_async()
            .map_err(|e| {
                // WARN, not ERROR: this runs on every reconnect attempt
                tracing::warn!(port = %port_name, error = %e, "Failed to open serial port");
                HardwareError::io(
                    DeviceKind::Scale,
                    format!(
                        "Failed to open serial port {}: {}. Tip: Ensure the port is not used by another application and that you have sufficient permissions.",
                        port_name, e
                    ),
                )
            })?;

        self.port = Some(port);
        self.framer.clear();

        tracing::debug!(port = %self.config.port, "Serial port opened successfully");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.shutdown().await {
                tracing::warn!(error = %e, "Error shutting down serial port");
            }
        }
        self.framer.clear();

        tracing::info!(port = %self.config.port, "Serial port disconnected");
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.config.port.clone()
    }

    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), HardwareError> {
        if endpoint.trim().is_empty() {
            return Err(HardwareError::InvalidConfig("Empty serial port name".into()));
        }
        self.config.port = endpoint.trim().to_string();
        Ok(())
    }
}

#[async_trait]
impl ScaleConnection for Rs232Scale {
    async fn read_grams(&mut self) -> Result<f64, HardwareError> {
        let port = self
            .port
            .as_mut()
            .ok_or(HardwareError::DeviceNotConnected(DeviceKind::Scale))?;

        if let Some(command) = &self.config.request_command {
            port.write_all(command.as_bytes())
                .await
                .map_err(|e| HardwareError::io(DeviceKind::Scale, format!("Write error: {}", e)))?;
            port.flush()
                .await
                .map_err(|e| HardwareError::io(DeviceKind::Scale, format!("Flush error: {}", e)))?;
        }

        let line = self
            .framer
            .read_line(port)
            .await
            .map_err(|e| HardwareError::io(DeviceKind::Scale, format!("Read error: {}", e)))?;

        grams_from_line(&self.parser, &line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rs232_config_defaults() {
        let config = Rs232Config::new("COM1".to_string());
        assert_eq!(config.port, "COM1");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.parity, "None");
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.timeout_ms, 1000);
        assert!(config.request_command.is_none());
    }

    #[test]
    fn test_rs232_config_conversions() {
        let mut config = Rs232Config::new("COM1".to_string());
        config.parity = "Even".to_string();
        assert!(config.to_parity().is_ok());

        config.parity = "Mark".to_string();
        assert!(config.to_parity().is_err());

        config.stop_bits = 3;
        assert!(config.to_stop_bits().is_err());

        config.data_bits = 9;
        assert!(config.to_data_bits().is_err());
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"\r\n\r\nST,GS,  1.00kg\r\n");
        assert_eq!(framer.next_line().as_deref(), Some("ST,GS,  1.00kg"));
        assert_eq!(framer.next_line(), None);
    }

    #[test]
    fn test_framer_keeps_partial_line() {
        let mut framer = LineFramer::new();
        framer.push(b"ST,GS,  1.0");
        assert_eq!(framer.next_line(), None);
        framer.push(b"0kg\n");
        assert_eq!(framer.next_line().as_deref(), Some("ST,GS,  1.00kg"));
    }

    #[test]
    fn test_latest_line_drops_stale_samples() {
        let mut framer = LineFramer::new();
        framer.push(b"ST,GS,  1.00kg\r\nST,GS,  2.00kg\r\nST,GS,  3.0");
        assert_eq!(framer.latest_line().as_deref(), Some("ST,GS,  2.00kg"));
    }

    #[tokio::test]
    async fn test_read_grams_requires_open_port() {
        let mut scale = Rs232Scale::new(Rs232Config::new("COM1".to_string()));
        let err = scale.read_grams().await.unwrap_err();
        assert_eq!(err, HardwareError::DeviceNotConnected(DeviceKind::Scale));
    }

    #[test]
    fn test_set_endpoint() {
        let mut scale = Rs232Scale::new(Rs232Config::new("COM1".to_string()));
        scale.set_endpoint("/dev/ttyUSB0").unwrap();
        assert_eq!(scale.endpoint(), "/dev/ttyUSB0");
        assert!(scale.set_endpoint("  ").is_err());
    }
}
