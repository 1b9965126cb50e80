use std::sync::{Arc, Mutex, MutexGuard};

use domain::event::EventPublisher;
use domain::{DeviceKind, HardwareError, HardwareEvent, PrintJob, ScanEvent, WeightReading};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::printer::PrinterController;
use crate::scale::ScaleController;

/// Operator request to print the label for the active scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintRequest {
    pub order_number: String,
    pub sequence: u32,
    pub total: u32,
    #[serde(default)]
    pub description: String,
    /// Kilograms; falls back to the scale's latest reading
    #[serde(default)]
    pub weight: Option<f64>,
}

/// What the station shows after a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanView {
    pub scan: ScanEvent,
    pub weight: Option<WeightReading>,
}

/// Ties scans, weight and labels together for one packing station
pub struct WarehouseOrchestrator {
    scale: Arc<ScaleController>,
    printer: Arc<PrinterController>,
    events: Option<Arc<dyn EventPublisher>>,
    active_scan: Mutex<Option<ScanEvent>>,
}

impl WarehouseOrchestrator {
    pub fn new(scale: Arc<ScaleController>, printer: Arc<PrinterController>) -> Self {
        Self {
            scale,
            printer,
            events: None,
            active_scan: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Remember the scan and pair it with the weight snapshot. Never waits
    /// on the scale.
    pub async fn on_scan(&self, scan: ScanEvent) -> ScanView {
        let weight = self.scale.current_reading();
        info!(
            barcode = %scan.barcode,
            source = ?scan.source,
            weight_kg = weight.map(|w| w.net_kilograms()),
            "Package scanned"
        );

        *self.lock_scan() = Some(scan.clone());
        self.publish(HardwareEvent::scan_captured(scan.clone(), weight))
            .await;

        ScanView { scan, weight }
    }

    pub fn active_scan(&self) -> Option<ScanEvent> {
        self.lock_scan().clone()
    }

    pub fn clear_scan(&self) {
        *self.lock_scan() = None;
    }

    /// Build a job from the active scan and submit it. A failure leaves the
    /// active scan in place so the operator can retry.
    ///
    /// The scan is read once up front; a scan arriving while the job is on
    /// the wire does not change which package the result is reported for.
    pub async fn print_label(&self, request: PrintRequest) -> Result<PrintJob, HardwareError> {
        let scan = self.active_scan();
        let package_number = scan.as_ref().map(|s| s.barcode.clone());

        let result = match scan {
            Some(scan) => self.submit(scan, request).await,
            None => Err(HardwareError::NoActiveScan),
        };
        match &result {
            Ok(job) => {
                self.publish(HardwareEvent::print_succeeded(job.package_number.clone()))
                    .await
            }
            Err(e) => self.publish(HardwareEvent::print_failed(package_number, e)).await,
        }
        result
    }

    async fn submit(&self, scan: ScanEvent, request: PrintRequest) -> Result<PrintJob, HardwareError> {
        let weight = match request.weight {
            Some(weight) => weight,
            None => self
                .scale
                .current_reading()
                .map(|reading| reading.net_kilograms())
                .ok_or(HardwareError::DeviceNotConnected(DeviceKind::Scale))?,
        };

        let job = PrintJob {
            package_number: scan.barcode,
            order_number: request.order_number,
            sequence: request.sequence,
            total: request.total,
            description: request.description,
            weight,
        };
        self.printer.submit(job.clone()).await?;
        Ok(job)
    }

    async fn publish(&self, event: HardwareEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.publish(event).await {
                warn!("Failed to publish event: {}", e);
            }
        }
    }

    fn lock_scan(&self) -> MutexGuard<'_, Option<ScanEvent>> {
        self.active_scan.lock().unwrap_or_else(|e| e.into_inner())
    }
}
