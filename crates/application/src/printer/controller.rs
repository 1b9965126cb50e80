use std::time::Duration;

use domain::device::{Device, DeviceStatus, PrinterConnection};
use domain::{ConnectionState, DeviceKind, HardwareError, PrintJob};
use infrastructure::PrinterConfig;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::builder::LabelBuilder;
use crate::device::link::bounded;
use crate::device::{DeviceCommandSerializer, DeviceLink};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrinterSettings {
    pub io_timeout: Duration,
    /// Pause before the single transparent retry
    pub retry_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(250),
            max_reconnect_attempts: 3,
        }
    }
}

impl From<&PrinterConfig> for PrinterSettings {
    fn from(config: &PrinterConfig) -> Self {
        Self {
            io_timeout: Duration::from_millis(config.io_timeout_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Label printer. Jobs are validated up front, then queued per device
/// through the serializer so only one job is ever on the wire.
pub struct PrinterController {
    device_id: String,
    station_id: String,
    serializer: DeviceCommandSerializer,
    link: Mutex<DeviceLink<dyn PrinterConnection>>,
    status: watch::Receiver<DeviceStatus>,
    settings: PrinterSettings,
}

impl PrinterController {
    pub fn new(
        device_id: impl Into<String>,
        connection: Box<dyn PrinterConnection>,
        serializer: DeviceCommandSerializer,
        settings: PrinterSettings,
    ) -> Self {
        let device = Device::new(device_id, DeviceKind::Printer);
        let link = DeviceLink::new(
            device.clone(),
            connection,
            settings.io_timeout,
            settings.max_reconnect_attempts,
        );
        let status = link.subscribe();
        Self {
            device_id: device.id,
            station_id: "station".to_string(),
            serializer,
            link: Mutex::new(link),
            status,
            settings,
        }
    }

    /// Station name printed on test labels
    pub fn with_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = station_id.into();
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Print a package label. Invalid jobs are rejected before any device I/O.
    pub async fn submit(&self, job: PrintJob) -> Result<(), HardwareError> {
        let job_id = Uuid::new_v4();
        if let Err(e) = job.validate() {
            warn!(job_id = %job_id, package_number = %job.package_number, error = %e, "Rejected print job");
            return Err(e);
        }

        info!(
            job_id = %job_id,
            package_number = %job.package_number,
            sequence = job.sequence,
            total = job.total,
            "Print job queued"
        );
        let payload = LabelBuilder::package_label(&job);
        self.print(job_id, payload).await
    }

    /// Fixed self-test label through the same queue as package labels
    pub async fn print_test(&self) -> Result<(), HardwareError> {
        let job_id = Uuid::new_v4();
        info!(job_id = %job_id, "Test label queued");
        let printed_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let payload = LabelBuilder::test_label(&self.station_id, &printed_at);
        self.print(job_id, payload).await
    }

    pub async fn connect(&self) -> Result<ConnectionState, HardwareError> {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut link = self.link.lock().await;
                link.connect().await?;
                Ok(link.state())
            })
            .await
    }

    pub async fn disconnect(&self) -> ConnectionState {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut link = self.link.lock().await;
                link.disconnect().await;
                link.state()
            })
            .await
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.status.clone()
    }

    async fn print(&self, job_id: Uuid, payload: Vec<u8>) -> Result<(), HardwareError> {
        let result = self
            .serializer
            .with_device(&self.device_id, || async {
                let mut link = self.link.lock().await;
                link.ready().await?;
                self.send_with_retry(&mut link, job_id, &payload).await
            })
            .await;

        match &result {
            Ok(()) => info!(job_id = %job_id, bytes = payload.len(), "Print job sent"),
            Err(e) => error!(job_id = %job_id, error = %e, "Print job failed"),
        }
        result
    }

    async fn send_with_retry(
        &self,
        link: &mut DeviceLink<dyn PrinterConnection>,
        job_id: Uuid,
        payload: &[u8],
    ) -> Result<(), HardwareError> {
        let limit = link.io_timeout();
        let first = bounded(
            DeviceKind::Printer,
            limit,
            link.connection_mut().send_commands(payload),
        )
        .await;

        let error = match first {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        warn!(job_id = %job_id, error = %error, "Print failed, retrying once");
        tokio::time::sleep(self.settings.retry_delay).await;

        // Fresh handle for the retry; a failed write may have left the old one dead
        let _ = bounded(DeviceKind::Printer, limit, link.connection_mut().disconnect()).await;
        let reconnected = bounded(DeviceKind::Printer, limit, link.connection_mut().connect()).await;
        let retried = match reconnected {
            Ok(()) => {
                bounded(
                    DeviceKind::Printer,
                    limit,
                    link.connection_mut().send_commands(payload),
                )
                .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &retried {
            link.mark_io_failure(e);
        }
        retried
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::MockPrinter;

    fn controller(printer: &MockPrinter) -> PrinterController {
        PrinterController::new(
            "printer-01",
            Box::new(printer.clone()),
            DeviceCommandSerializer::new(),
            PrinterSettings {
                retry_delay: Duration::ZERO,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_print_test_label() {
        let printer = MockPrinter::new();
        let controller = controller(&printer).with_station_id("packing-3");
        controller.connect().await.unwrap();

        controller.print_test().await.unwrap();

        let jobs = printer.jobs.lock().await;
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].windows(9).any(|w| w == b"packing-3"));
    }

    #[tokio::test]
    async fn test_not_connected_fails_without_io() {
        let printer = MockPrinter::new();
        let controller = controller(&printer);

        let err = controller.print_test().await.unwrap_err();
        assert_eq!(err, HardwareError::DeviceNotConnected(DeviceKind::Printer));
        assert_eq!(printer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_reports_state() {
        let printer = MockPrinter::new();
        let controller = controller(&printer);

        assert_eq!(controller.connect().await.unwrap(), ConnectionState::Connected);
        assert_eq!(controller.disconnect().await, ConnectionState::Disconnected);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }
}
