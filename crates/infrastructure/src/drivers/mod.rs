mod mock_scale;
pub mod rs232;
mod simulator;

pub use mock_scale::MockScale;
pub use rs232::{LineFramer, Rs232Config, Rs232Scale, grams_from_line};
pub use simulator::{SimulatedScale, SimulatorConfig};

use std::time::Duration;

use domain::HardwareError;
use domain::device::{PrinterConnection, ScaleConnection};

use crate::config::{PrinterConfig, PrinterType, ScaleConfig, ScaleDriver};
use crate::printer::{FilePrinter, MockPrinter, NetworkPrinter};

/// Factory for creating device connections from station configuration
pub struct DeviceFactory;

impl DeviceFactory {
    /// Create a scale connection. An RS232 scale without a port stays
    /// unbound until `connect(port)` supplies one.
    pub fn create_scale(config: &ScaleConfig) -> Result<Box<dyn ScaleConnection>, HardwareError> {
        match config.driver {
            ScaleDriver::RS232 => {
                let rs232 = config.rs232().unwrap_or_else(|| {
                    let mut unbound = Rs232Config::new(String::new());
                    unbound.timeout_ms = config.io_timeout_ms;
                    unbound
                });
                Ok(Box::new(Rs232Scale::new(rs232)) as Box<dyn ScaleConnection>)
            }
            ScaleDriver::Simulator => {
                let sim_config = config.simulator.clone().unwrap_or_default();
                if sim_config.period_secs <= 0.0 {
                    return Err(HardwareError::InvalidConfig(format!(
                        "Simulator period must be positive, got {}",
                        sim_config.period_secs
                    )));
                }
                Ok(Box::new(SimulatedScale::new(sim_config)) as Box<dyn ScaleConnection>)
            }
            ScaleDriver::Mock => Ok(Box::new(MockScale::new(0.0)) as Box<dyn ScaleConnection>),
        }
    }

    pub fn create_printer(
        config: &PrinterConfig,
    ) -> Result<Box<dyn PrinterConnection>, HardwareError> {
        match config.r#type {
            PrinterType::Network => {
                let printer = NetworkPrinter::new(&config.host, config.port)
                    .with_timeout(Duration::from_millis(config.io_timeout_ms));
                Ok(Box::new(printer) as Box<dyn PrinterConnection>)
            }
            PrinterType::File => {
                let path = config.path.as_deref().ok_or_else(|| {
                    HardwareError::InvalidConfig("File printer requires 'path'".to_string())
                })?;
                Ok(Box::new(FilePrinter::new(path)) as Box<dyn PrinterConnection>)
            }
            PrinterType::Mock => Ok(Box::new(MockPrinter::new()) as Box<dyn PrinterConnection>),
        }
    }
}
