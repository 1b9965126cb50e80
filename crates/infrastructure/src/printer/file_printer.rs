use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, PrinterConnection};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Printer exposed as a file or shared queue (e.g. `/dev/usb/lp0`, `\\host\zebra`)
pub struct FilePrinter {
    path: PathBuf,
    connected: bool,
}

impl FilePrinter {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            connected: false,
        }
    }
}

#[async_trait]
impl DeviceConnection for FilePrinter {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        info!("Preparing to print to file/share: {:?}", self.path);
        // Handles are opened per job; keeping one open locks network shares
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                HardwareError::io(
                    DeviceKind::Printer,
                    format!("Cannot open {:?}: {}", self.path, e),
                )
            })?;
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        self.connected = false;
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), HardwareError> {
        self.path = PathBuf::from(endpoint);
        Ok(())
    }
}

#[async_trait]
impl PrinterConnection for FilePrinter {
    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), HardwareError> {
        if !self.connected {
            return Err(HardwareError::DeviceNotConnected(DeviceKind::Printer));
        }

        // Open, write, close for each job so data reaches the share immediately
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open printer file {:?}: {}", self.path, e);
                HardwareError::io(DeviceKind::Printer, e.to_string())
            })?;

        file.write_all(commands).await.map_err(|e| {
            error!("Failed to write to printer file: {}", e);
            HardwareError::io(DeviceKind::Printer, e.to_string())
        })?;
        file.flush().await.map_err(|e| {
            error!("Failed to flush to printer file: {}", e);
            HardwareError::io(DeviceKind::Printer, e.to_string())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_jobs_to_file() {
        let path = std::env::temp_dir().join(format!("label-{}.prn", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut printer = FilePrinter::new(path.to_str().unwrap());

        printer.connect().await.unwrap();
        printer.send_commands(b"one").await.unwrap();
        printer.send_commands(b"two").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"onetwo");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_requires_connect() {
        let mut printer = FilePrinter::new("unused.prn");
        assert!(printer.send_commands(b"x").await.is_err());
    }
}
