use std::time::Duration;

use domain::device::{Device, DeviceStatus, ScaleConnection};
use domain::{ConnectionState, DeviceKind, HardwareError, WeightReading};
use infrastructure::ScaleConfig;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::device::link::bounded;
use crate::device::{DeviceCommandSerializer, DeviceLink};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSettings {
    pub io_timeout: Duration,
    /// Consecutive failed polls before the link drops to `Reconnecting`
    pub failure_threshold: u32,
    pub max_reconnect_attempts: u32,
    /// Readings that move less than this do not wake subscribers
    pub change_threshold_grams: f64,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(1),
            failure_threshold: 3,
            max_reconnect_attempts: 5,
            change_threshold_grams: 5.0,
        }
    }
}

impl From<&ScaleConfig> for ScaleSettings {
    fn from(config: &ScaleConfig) -> Self {
        Self {
            io_timeout: Duration::from_millis(config.io_timeout_ms),
            failure_threshold: config.failure_threshold.max(1),
            max_reconnect_attempts: config.max_reconnect_attempts,
            change_threshold_grams: config.change_threshold_grams,
        }
    }
}

/// Tare taken during one connection session
#[derive(Debug, Clone, Copy)]
struct Tare {
    session: u64,
    grams: f64,
}

struct ScaleState {
    link: DeviceLink<dyn ScaleConnection>,
    failures: u32,
    tare: Option<Tare>,
}

impl ScaleState {
    /// Offset for the current session; a reconnect starts again from zero
    fn tare_offset(&self) -> f64 {
        match self.tare {
            Some(tare) if tare.session == self.link.session() => tare.grams,
            _ => 0.0,
        }
    }
}

/// Weighing scale. Cadence is driven by the caller through [`poll`];
/// the latest reading is published as an immutable snapshot.
///
/// [`poll`]: ScaleController::poll
pub struct ScaleController {
    device_id: String,
    serializer: DeviceCommandSerializer,
    inner: Mutex<ScaleState>,
    readings: watch::Sender<Option<WeightReading>>,
    status: watch::Receiver<DeviceStatus>,
    settings: ScaleSettings,
}

impl ScaleController {
    pub fn new(
        device_id: impl Into<String>,
        connection: Box<dyn ScaleConnection>,
        serializer: DeviceCommandSerializer,
        settings: ScaleSettings,
    ) -> Self {
        let device = Device::new(device_id, DeviceKind::Scale);
        let link = DeviceLink::new(
            device.clone(),
            connection,
            settings.io_timeout,
            settings.max_reconnect_attempts,
        );
        let status = link.subscribe();
        let (readings, _) = watch::channel(None);
        Self {
            device_id: device.id,
            serializer,
            inner: Mutex::new(ScaleState {
                link,
                failures: 0,
                tare: None,
            }),
            readings,
            status,
            settings,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Take one reading from the device
    pub async fn poll(&self) -> Result<WeightReading, HardwareError> {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut inner = self.inner.lock().await;
                let raw = self.read_raw(&mut inner).await?;
                let reading = WeightReading::new(raw, inner.tare_offset());
                self.publish(reading);
                Ok(reading)
            })
            .await
    }

    /// Zero the scale at the current raw weight
    pub async fn tare(&self) -> Result<WeightReading, HardwareError> {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut inner = self.inner.lock().await;
                let raw = self.read_raw(&mut inner).await?;
                let session = inner.link.session();
                inner.tare = Some(Tare {
                    session,
                    grams: raw,
                });
                info!(device_id = %self.device_id, tare_grams = raw, "Scale tared");

                let reading = WeightReading::new(raw, raw);
                self.readings.send_replace(Some(reading));
                Ok(reading)
            })
            .await
    }

    /// Connect, optionally rebinding to another port first
    pub async fn connect(&self, port: Option<&str>) -> Result<ConnectionState, HardwareError> {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut inner = self.inner.lock().await;
                if let Some(port) = port {
                    inner.link.set_endpoint(port).await?;
                }
                inner.failures = 0;
                inner.link.connect().await?;
                Ok(inner.link.state())
            })
            .await
    }

    pub async fn disconnect(&self) -> ConnectionState {
        self.serializer
            .with_device(&self.device_id, || async {
                let mut inner = self.inner.lock().await;
                inner.link.disconnect().await;
                inner.failures = 0;
                self.readings.send_replace(None);
                inner.link.state()
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

    /// Latest reading without touching the device
    pub fn current_reading(&self) -> Option<WeightReading> {
        *self.readings.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WeightReading>> {
        self.readings.subscribe()
    }

    /// One read, retried once on a transient error. Failures count towards
    /// the streak that moves the link to `Reconnecting`.
    async fn read_raw(&self, inner: &mut ScaleState) -> Result<f64, HardwareError> {
        inner.link.ready().await?;

        let limit = inner.link.io_timeout();
        let first = bounded(DeviceKind::Scale, limit, inner.link.connection_mut().read_grams()).await;
        let result = match first {
            Err(e) if e.is_transient() => {
                debug!(device_id = %self.device_id, error = %e, "Scale read failed, retrying once");
                bounded(DeviceKind::Scale, limit, inner.link.connection_mut().read_grams()).await
            }
            other => other,
        };

        match result {
            Ok(grams) => {
                inner.failures = 0;
                Ok(grams)
            }
            Err(e) => {
                inner.failures += 1;
                warn!(
                    device_id = %self.device_id,
                    failures = inner.failures,
                    threshold = self.settings.failure_threshold,
                    error = %e,
                    "Scale read failed"
                );
                if inner.failures >= self.settings.failure_threshold {
                    inner.failures = 0;
                    if inner.link.mark_io_failure(&e) {
                        self.readings.send_replace(None);
                    }
                }
                Err(e)
            }
        }
    }

    fn publish(&self, reading: WeightReading) {
        let threshold = self.settings.change_threshold_grams;
        self.readings.send_if_modified(|current| {
            let changed = match current {
                Some(previous) => {
                    (previous.net_grams() - reading.net_grams()).abs() >= threshold
                        || previous.tare_offset != reading.tare_offset
                }
                None => true,
            };
            *current = Some(reading);
            changed
        });
    }
}
