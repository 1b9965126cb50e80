use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, PrinterConnection};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory printer. Clones share the recorded output and fault switches.
#[derive(Clone)]
pub struct MockPrinter {
    pub connected: bool,
    pub sent_data: Arc<Mutex<Vec<u8>>>,
    /// One entry per successful `send_commands` call
    pub jobs: Arc<Mutex<Vec<Vec<u8>>>>,
    /// `begin N` / `end N` / `fail N` markers, in wire order
    pub journal: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failing_writes: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
    write_delay: Duration,
}

impl Default for MockPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPrinter {
    pub fn new() -> Self {
        Self {
            connected: false,
            sent_data: Arc::new(Mutex::new(Vec::new())),
            jobs: Arc::new(Mutex::new(Vec::new())),
            journal: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            failing_writes: Arc::new(AtomicUsize::new(0)),
            offline: Arc::new(AtomicBool::new(false)),
            write_delay: Duration::ZERO,
        }
    }

    /// Each write takes this long on the "wire"
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// The next `count` writes fail (jammed / busy)
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Powered off: connects and writes fail
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `send_commands` calls that reached the device
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceConnection for MockPrinter {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(HardwareError::io(DeviceKind::Printer, "Printer offline"));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        self.connected = false;
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

#[async_trait]
impl PrinterConnection for MockPrinter {
    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), HardwareError> {
        if !self.connected {
            return Err(HardwareError::DeviceNotConnected(DeviceKind::Printer));
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.lock().await.push(format!("begin {}", attempt));

        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }

        let jammed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if jammed || self.offline.load(Ordering::SeqCst) {
            self.journal.lock().await.push(format!("fail {}", attempt));
            return Err(HardwareError::io(DeviceKind::Printer, "Paper jam"));
        }

        self.sent_data.lock().await.extend_from_slice(commands);
        self.jobs.lock().await.push(commands.to_vec());
        self.journal.lock().await.push(format!("end {}", attempt));
        Ok(())
    }
}
