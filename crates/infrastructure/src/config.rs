use config::{Config, ConfigError, Environment, File, FileFormat};
use domain::Terminator;
use serde::{Deserialize, Serialize};

use crate::drivers::{Rs232Config, SimulatorConfig};
use crate::drivers::rs232::{default_baud_rate, default_data_bits, default_parity, default_stop_bits};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDriver {
    RS232,
    Simulator,
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScaleConfig {
    #[serde(default = "default_scale_id")]
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_scale_driver")]
    pub driver: ScaleDriver,

    // Serial framing, RS232 only
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub request_command: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_scale_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Consecutive failed polls before the link drops to Reconnecting
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_scale_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Readings closer than this to the last published one are not re-broadcast
    #[serde(default = "default_change_threshold_grams")]
    pub change_threshold_grams: f64,

    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

impl ScaleConfig {
    /// Serial settings for the RS232 driver, `None` when no port is configured
    pub fn rs232(&self) -> Option<Rs232Config> {
        let port = self.port.clone()?;
        Some(Rs232Config {
            port,
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            parity: self.parity.clone(),
            stop_bits: self.stop_bits,
            timeout_ms: self.io_timeout_ms,
            request_command: self.request_command.clone(),
        })
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            id: default_scale_id(),
            enabled: default_enabled(),
            driver: default_scale_driver(),
            port: None,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            request_command: None,
            poll_interval_ms: default_poll_interval_ms(),
            io_timeout_ms: default_scale_io_timeout_ms(),
            failure_threshold: default_failure_threshold(),
            max_reconnect_attempts: default_scale_reconnect_attempts(),
            change_threshold_grams: default_change_threshold_grams(),
            simulator: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum PrinterType {
    Network,
    File,
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PrinterConfig {
    #[serde(default = "default_printer_id")]
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_printer_type")]
    pub r#type: PrinterType,
    #[serde(default = "default_printer_host")]
    pub host: String,
    #[serde(default = "default_printer_port")]
    pub port: u16,
    pub path: Option<String>, // Required if type is "File"
    #[serde(default = "default_printer_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Pause before the single transparent retry of a failed job
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_printer_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            id: default_printer_id(),
            enabled: default_enabled(),
            r#type: default_printer_type(),
            host: default_printer_host(),
            port: default_printer_port(),
            path: None,
            io_timeout_ms: default_printer_io_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_reconnect_attempts: default_printer_reconnect_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScannerConfig {
    #[serde(default = "default_gap_threshold_ms")]
    pub gap_threshold_ms: u64,
    #[serde(default)]
    pub terminator: Terminator,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            gap_threshold_ms: default_gap_threshold_ms(),
            terminator: Terminator::default(),
            min_length: default_min_length(),
            max_length: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WarehouseConfig {
    pub station_id: String,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

fn default_enabled() -> bool {
    true
}
fn default_scale_id() -> String {
    "scale-01".to_string()
}
fn default_scale_driver() -> ScaleDriver {
    ScaleDriver::RS232
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_scale_io_timeout_ms() -> u64 {
    1000
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_scale_reconnect_attempts() -> u32 {
    5
}
fn default_change_threshold_grams() -> f64 {
    5.0
}
fn default_printer_id() -> String {
    "printer-01".to_string()
}
fn default_printer_type() -> PrinterType {
    PrinterType::Network
}
fn default_printer_host() -> String {
    "127.0.0.1".to_string()
}
fn default_printer_port() -> u16 {
    9100
}
fn default_printer_io_timeout_ms() -> u64 {
    5000
}
fn default_retry_delay_ms() -> u64 {
    250
}
fn default_printer_reconnect_attempts() -> u32 {
    3
}
fn default_gap_threshold_ms() -> u64 {
    100
}
fn default_min_length() -> usize {
    1
}
fn default_frame_interval_ms() -> u64 {
    100
}

impl WarehouseConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("station_id", "station-01")?
            // Station file is REQUIRED so a misplaced config dir fails loudly
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. WAREHOUSE__SCALE__PORT=COM4)
            .add_source(Environment::with_prefix("WAREHOUSE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a single TOML document on top of the built-in defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("station_id", "station-01")?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
