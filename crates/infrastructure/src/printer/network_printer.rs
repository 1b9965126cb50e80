use async_trait::async_trait;
use domain::HardwareError;
use domain::device::{DeviceConnection, DeviceKind, PrinterConnection};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{error, info};

/// Thermal printer reachable over raw TCP (JetDirect, port 9100)
pub struct NetworkPrinter {
    address: String,
    stream: Option<TcpStream>,
    timeout: Duration,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            stream: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DeviceConnection for NetworkPrinter {
    async fn connect(&mut self) -> Result<(), HardwareError> {
        info!("Connecting to printer at {}", self.address);
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                info!("Connected to printer!");
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(HardwareError::io(DeviceKind::Printer, e.to_string())),
            Err(_) => Err(HardwareError::Timeout {
                kind: DeviceKind::Printer,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn disconnect(&mut self) -> Result<(), HardwareError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.address.clone()
    }

    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), HardwareError> {
        if !endpoint.contains(':') {
            return Err(HardwareError::InvalidConfig(format!(
                "Printer address must be host:port, got '{}'",
                endpoint
            )));
        }
        self.address = endpoint.to_string();
        Ok(())
    }
}

#[async_trait]
impl PrinterConnection for NetworkPrinter {
    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), HardwareError> {
        let Some(stream) = &mut self.stream else {
            return Err(HardwareError::DeviceNotConnected(DeviceKind::Printer));
        };

        let written = async {
            stream.write_all(commands).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            error!("Failed to write to printer: {}", e);
            self.stream = None; // Invalidate connection
            return Err(HardwareError::io(DeviceKind::Printer, e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_sends_bytes_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut printer = NetworkPrinter::new("127.0.0.1", port);
        printer.connect().await.unwrap();
        printer.send_commands(b"\x1b@LABEL").await.unwrap();
        printer.disconnect().await.unwrap();

        assert_eq!(server.await.unwrap(), b"\x1b@LABEL");
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let mut printer = NetworkPrinter::new("127.0.0.1", 9100);
        let err = printer.send_commands(b"x").await.unwrap_err();
        assert_eq!(err, HardwareError::DeviceNotConnected(DeviceKind::Printer));
    }
}
