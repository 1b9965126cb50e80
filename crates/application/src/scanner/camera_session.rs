use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use domain::camera::{CameraInfo, CameraProvider, CameraSelector, FrameDecoder};
use domain::{HardwareError, ScanEvent, ScanSource};
use infrastructure::CameraConfig;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a decode session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Decoded(ScanEvent),
    /// Stopped before anything was decoded
    Cancelled,
    /// The camera went away mid-session
    Failed(HardwareError),
}

struct ActiveSession {
    id: u64,
    cancel: CancellationToken,
}

/// Camera barcode capture, one session at a time.
///
/// A session samples frames until the first successful decode or until it
/// is stopped. Claiming a decoded result and stopping both happen under the
/// same lock, so once `stop` returns no result of that session is emitted.
pub struct CameraDecodeSession {
    provider: Arc<dyn CameraProvider>,
    frame_interval: Duration,
    active: Arc<Mutex<Option<ActiveSession>>>,
    next_id: AtomicU64,
}

impl CameraDecodeSession {
    pub fn new(provider: Arc<dyn CameraProvider>, frame_interval: Duration) -> Self {
        Self {
            provider,
            frame_interval,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(provider: Arc<dyn CameraProvider>, config: &CameraConfig) -> Self {
        Self::new(provider, Duration::from_millis(config.frame_interval_ms.max(1)))
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Open a camera and start sampling. Fails with `SessionAlreadyActive`
    /// while another session runs, `NoDeviceAvailable` when the selector
    /// matches nothing and `CameraUnavailable` when acquisition fails.
    pub async fn start(&self, selector: &CameraSelector) -> Result<CameraSessionHandle, HardwareError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        {
            let mut active = lock(&self.active);
            if active.is_some() {
                return Err(HardwareError::SessionAlreadyActive);
            }
            // Reserve the slot before any await so concurrent starts conflict
            *active = Some(ActiveSession {
                id,
                cancel: cancel.clone(),
            });
        }

        let (camera, decoder) = match self.acquire(selector).await {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(session = id, error = %e, "Camera session failed to start");
                release(&self.active, id);
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            // Stopped while the camera was being opened
            return Err(HardwareError::CameraUnavailable(
                "Session stopped during startup".to_string(),
            ));
        }

        info!(session = id, camera = %camera.label, "Camera session started");
        let (outcome_tx, outcome_rx) = oneshot::channel();
        tokio::spawn(run_session(
            id,
            decoder,
            cancel.clone(),
            self.active.clone(),
            self.frame_interval,
            outcome_tx,
        ));

        Ok(CameraSessionHandle {
            id,
            camera,
            cancel,
            active: self.active.clone(),
            outcome: Some(outcome_rx),
        })
    }

    /// Stop whichever session is running. Returns `false` if none was.
    pub fn stop(&self) -> bool {
        match lock(&self.active).take() {
            Some(session) => {
                session.cancel.cancel();
                info!(session = session.id, "Camera session stopped");
                true
            }
            None => false,
        }
    }

    async fn acquire(
        &self,
        selector: &CameraSelector,
    ) -> Result<(CameraInfo, Box<dyn FrameDecoder>), HardwareError> {
        let devices = self.provider.enumerate().await?;
        let camera = selector.select(&devices)?.clone();
        let decoder = self.provider.open(&camera).await.map_err(|e| match e {
            HardwareError::CameraUnavailable(_) => e,
            other => HardwareError::CameraUnavailable(other.to_string()),
        })?;
        Ok((camera, decoder))
    }
}

/// Caller's side of a running session. Dropping the handle stops the
/// session and frees the camera.
pub struct CameraSessionHandle {
    id: u64,
    camera: CameraInfo,
    cancel: CancellationToken,
    active: Arc<Mutex<Option<ActiveSession>>>,
    outcome: Option<oneshot::Receiver<SessionOutcome>>,
}

impl CameraSessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn camera(&self) -> &CameraInfo {
        &self.camera
    }

    /// Stop this session if it is still the active one
    pub fn stop(&self) -> bool {
        let mut active = lock(&self.active);
        match active.as_ref() {
            Some(session) if session.id == self.id => {
                self.cancel.cancel();
                *active = None;
                info!(session = self.id, "Camera session stopped");
                true
            }
            _ => false,
        }
    }

    /// Wait for the session to finish
    pub async fn outcome(mut self) -> SessionOutcome {
        match self.outcome.take() {
            Some(outcome) => outcome.await.unwrap_or(SessionOutcome::Cancelled),
            None => SessionOutcome::Cancelled,
        }
    }
}

impl Drop for CameraSessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_session(
    id: u64,
    mut decoder: Box<dyn FrameDecoder>,
    cancel: CancellationToken,
    active: Arc<Mutex<Option<ActiveSession>>>,
    frame_interval: Duration,
    outcome_tx: oneshot::Sender<SessionOutcome>,
) {
    let outcome = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break SessionOutcome::Cancelled,
            frame = decoder.decode_frame() => frame,
        };

        match frame {
            Ok(Some(barcode)) => {
                let mut slot = lock(&active);
                if cancel.is_cancelled() {
                    break SessionOutcome::Cancelled;
                }
                if slot.as_ref().is_some_and(|s| s.id == id) {
                    *slot = None;
                }
                info!(session = id, barcode = %barcode, "Camera decoded barcode");
                break SessionOutcome::Decoded(ScanEvent::new(barcode, ScanSource::Camera));
            }
            Ok(None) => {
                tokio::select! {
                    _ = cancel.cancelled() => break SessionOutcome::Cancelled,
                    _ = tokio::time::sleep(frame_interval) => {}
                }
            }
            Err(e) => {
                warn!(session = id, error = %e, "Camera failed mid-session");
                release(&active, id);
                let error = match e {
                    HardwareError::CameraUnavailable(_) => e,
                    other => HardwareError::CameraUnavailable(other.to_string()),
                };
                break SessionOutcome::Failed(error);
            }
        }
    };

    // Camera is released here, before the outcome is observable
    drop(decoder);
    debug!(session = id, outcome = ?outcome, "Camera session ended");
    let _ = outcome_tx.send(outcome);
}

fn lock(active: &Mutex<Option<ActiveSession>>) -> MutexGuard<'_, Option<ActiveSession>> {
    active.lock().unwrap_or_else(|e| e.into_inner())
}

fn release(active: &Mutex<Option<ActiveSession>>, id: u64) {
    let mut slot = lock(active);
    if slot.as_ref().is_some_and(|s| s.id == id) {
        *slot = None;
    }
}
