use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, ScaleConnection};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockScaleState {
    grams: f64,
    connected: bool,
    unplugged: bool,
    failing_reads: usize,
    read_delay: Duration,
    reads: usize,
    connects: usize,
}

/// In-memory scale with fault injection. Clones share state, so a test can
/// keep one handle while the controller owns the other.
#[derive(Clone, Default)]
pub struct MockScale {
    state: Arc<Mutex<MockScaleState>>,
}

impl MockScale {
    pub fn new(grams: f64) -> Self {
        let scale = Self::default();
        scale.set_grams(grams);
        scale
    }

    fn lock(&self) -> MutexGuard<'_, MockScaleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_grams(&self, grams: f64) {
        self.lock().grams = grams;
    }

    /// The next `count` reads fail with an I/O error
    pub fn fail_next_reads(&self, count: usize) {
        self.lock().failing_reads = count;
    }

    /// Cable pulled: reads and connects fail until plugged back
    pub fn set_unplugged(&self, unplugged: bool) {
        self.lock().unplugged = unplugged;
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }
}

#[async_trait]
impl DeviceConnection for MockScale {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        let mut state = self.lock();
        state.connects += 1;
        if state.unplugged {
            return Err(HardwareError::io(DeviceKind::Scale, "No such device"));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        self.lock().connected = false;
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }

    fn set_endpoint(&mut self, _endpoint: &str) -> Result<(), HardwareError> {
        Ok(())
    }
}

#[async_trait]
impl ScaleConnection for MockScale {
    async fn read_grams(&mut self) -> Result<f64, HardwareError> {
        let delay = {
            let mut state = self.lock();
            state.reads += 1;
            state.read_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if !state.connected {
            return Err(HardwareError::DeviceNotConnected(DeviceKind::Scale));
        }
        if state.unplugged {
            return Err(HardwareError::io(DeviceKind::Scale, "Device vanished"));
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(HardwareError::io(DeviceKind::Scale, "Simulated read failure"));
        }
        Ok(state.grams)
    }
}
