use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, ScaleConnection};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::rs232::grams_from_line;
use crate::parser::ScaleParser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Weight the simulated platform settles around
    #[serde(default = "default_base_grams")]
    pub base_grams: f64,
    /// Sine wobble amplitude (package being placed / vibration)
    #[serde(default)]
    pub amplitude_grams: f64,
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
}

fn default_base_grams() -> f64 {
    1500.0
}
fn default_period_secs() -> f64 {
    10.0
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_grams: default_base_grams(),
            amplitude_grams: 0.0,
            period_secs: default_period_secs(),
        }
    }
}

/// Scale without hardware. Produces Mettler-Toledo style lines and decodes
/// them through the same parser as the serial driver.
pub struct SimulatedScale {
    config: SimulatorConfig,
    parser: ScaleParser,
    start_time: Instant,
    connected: bool,
}

impl SimulatedScale {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            parser: ScaleParser::new(),
            start_time: Instant::now(),
            connected: false,
        }
    }

    fn generate_current_line(&self) -> String {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let period = if self.config.period_secs > 0.0 {
            self.config.period_secs
        } else {
            default_period_secs()
        };

        let grams = self.config.base_grams
            + self.config.amplitude_grams
                * (elapsed / period * 2.0 * std::f64::consts::PI).sin();
        let kilograms = grams.max(0.0).round() / 1000.0;

        // Format: "ST,GS,  12.345kg"
        format!("ST,GS,  {:.3}kg", kilograms)
    }
}

#[async_trait]
impl DeviceConnection for SimulatedScale {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        tracing::info!("Simulated scale connected with config: {:?}", self.config);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        tracing::info!("Simulated scale disconnected");
        self.connected = false;
        Ok(())
    }

    fn endpoint(&self) -> String {
        "simulator".to_string()
    }
}

#[async_trait]
impl ScaleConnection for SimulatedScale {
    async fn read_grams(&mut self) -> Result<f64, HardwareError> {
        if !self.connected {
            return Err(HardwareError::DeviceNotConnected(DeviceKind::Scale));
        }
        let line = self.generate_current_line();
        grams_from_line(&self.parser, &line)
    }
}
