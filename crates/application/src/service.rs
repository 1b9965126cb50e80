//! Transport-neutral hardware operations. Each method corresponds to one
//! endpoint of the station's HTTP/CLI surface and speaks in serde DTOs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::device::DeviceStatus;
use domain::{ConnectionState, HardwareError, PrintJob, PrintOutcome, WeightReading};
use serde::{Deserialize, Serialize};

use crate::printer::PrinterController;
use crate::scale::ScaleController;

/// Machine readable error for callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<HardwareError> for ErrorBody {
    fn from(error: HardwareError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightResponse {
    pub grams: f64,
    pub kilograms: f64,
    pub raw_grams: f64,
    pub tare_grams: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<WeightReading> for WeightResponse {
    fn from(reading: WeightReading) -> Self {
        Self {
            grams: reading.net_grams(),
            kilograms: reading.net_kilograms(),
            raw_grams: reading.raw_grams,
            tare_grams: reading.tare_offset,
            timestamp: reading.timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleConnectRequest {
    #[serde(default)]
    pub port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageLabelRequest {
    pub package_number: String,
    pub order_number: String,
    pub sequence: u32,
    pub total: u32,
    #[serde(default)]
    pub description: String,
    /// Kilograms
    pub weight: f64,
}

impl From<PackageLabelRequest> for PrintJob {
    fn from(request: PackageLabelRequest) -> Self {
        Self {
            package_number: request.package_number,
            order_number: request.order_number,
            sequence: request.sequence,
            total: request.total,
            description: request.description,
            weight: request.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: ConnectionState,
}

pub struct HardwareService {
    scale: Arc<ScaleController>,
    printer: Arc<PrinterController>,
}

impl HardwareService {
    pub fn new(scale: Arc<ScaleController>, printer: Arc<PrinterController>) -> Self {
        Self { scale, printer }
    }

    /// `GET /hardware/scale/weight`
    ///
    /// Serves the latest snapshot while connected and only reads the device
    /// when no reading exists yet.
    pub async fn scale_weight(&self) -> Result<WeightResponse, ErrorBody> {
        if self.scale.state() == ConnectionState::Connected {
            if let Some(reading) = self.scale.current_reading() {
                return Ok(reading.into());
            }
        }
        Ok(self.scale.poll().await?.into())
    }

    /// `POST /hardware/scale/tare`
    pub async fn scale_tare(&self) -> Result<WeightResponse, ErrorBody> {
        Ok(self.scale.tare().await?.into())
    }

    /// `POST /hardware/scale/connect`
    pub async fn scale_connect(
        &self,
        request: ScaleConnectRequest,
    ) -> Result<StateResponse, ErrorBody> {
        let state = self.scale.connect(request.port.as_deref()).await?;
        Ok(StateResponse { state })
    }

    /// `POST /hardware/scale/disconnect`
    pub async fn scale_disconnect(&self) -> StateResponse {
        StateResponse {
            state: self.scale.disconnect().await,
        }
    }

    /// `GET /hardware/scale/status`
    pub fn scale_status(&self) -> DeviceStatus {
        self.scale.status()
    }

    /// `POST /hardware/printer/package-label`
    pub async fn print_package_label(&self, request: PackageLabelRequest) -> PrintOutcome {
        self.printer.submit(request.into()).await.into()
    }

    /// `POST /hardware/printer/test`
    pub async fn print_test(&self) -> PrintOutcome {
        self.printer.print_test().await.into()
    }

    /// `GET /hardware/printer/status`
    pub fn printer_status(&self) -> DeviceStatus {
        self.printer.status()
    }

    pub async fn printer_connect(&self) -> Result<StateResponse, ErrorBody> {
        let state = self.printer.connect().await?;
        Ok(StateResponse { state })
    }

    pub async fn printer_disconnect(&self) -> StateResponse {
        StateResponse {
            state: self.printer.disconnect().await,
        }
    }
}
