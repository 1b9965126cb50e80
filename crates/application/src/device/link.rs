use std::future::Future;
use std::time::Duration;

use domain::device::{Device, DeviceConnection, DeviceStatus};
use domain::{ConnectionState, DeviceKind, HardwareError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run one device I/O call under a deadline. An expired deadline is
/// reported as `Timeout`, which callers treat like any other I/O failure.
pub(crate) async fn bounded<T, F>(kind: DeviceKind, limit: Duration, fut: F) -> Result<T, HardwareError>
where
    F: Future<Output = Result<T, HardwareError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(HardwareError::Timeout {
            kind,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

/// Owns one device connection and drives its `ConnectionState`.
///
/// Every transition is logged and published as a `DeviceStatus` snapshot on
/// a watch channel, so readers never need access to the link itself.
/// Reconnection is not scheduled in the background: while `Reconnecting`,
/// each call to [`DeviceLink::ready`] makes one attempt, and the link gives
/// up (`Error`) after `max_reconnect_attempts`.
pub struct DeviceLink<C: ?Sized + DeviceConnection> {
    device: Device,
    connection: Box<C>,
    state: ConnectionState,
    last_error: Option<String>,
    io_timeout: Duration,
    max_reconnect_attempts: u32,
    reconnect_attempts: u32,
    session: u64,
    status_tx: watch::Sender<DeviceStatus>,
}

impl<C: ?Sized + DeviceConnection> DeviceLink<C> {
    pub fn new(
        device: Device,
        connection: Box<C>,
        io_timeout: Duration,
        max_reconnect_attempts: u32,
    ) -> Self {
        let (status_tx, _) = watch::channel(DeviceStatus::disconnected(&device));
        Self {
            device,
            connection,
            state: ConnectionState::Disconnected,
            last_error: None,
            io_timeout,
            max_reconnect_attempts: max_reconnect_attempts.max(1),
            reconnect_attempts: 0,
            session: 0,
            status_tx,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Incremented on every entry into `Connected`. Anything tied to one
    /// physical session (e.g. a tare offset) compares against this.
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn endpoint(&self) -> String {
        self.connection.endpoint()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceStatus> {
        self.status_tx.subscribe()
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Rebind the link to another port/address. Closes the current
    /// connection first if one is open.
    pub async fn set_endpoint(&mut self, endpoint: &str) -> Result<(), HardwareError> {
        if self.connection.endpoint() == endpoint {
            return Ok(());
        }
        if self.state != ConnectionState::Disconnected {
            self.disconnect().await;
        }
        self.connection.set_endpoint(endpoint)
    }

    /// Manual connect. Idempotent while `Connected`; while `Reconnecting`
    /// it counts as one reconnect attempt.
    pub async fn connect(&mut self) -> Result<(), HardwareError> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Reconnecting => return self.try_reconnect().await,
            _ => {}
        }

        self.apply(self.state.to_connecting(), None);
        info!(device_id = %self.device.id, endpoint = %self.connection.endpoint(), "Connecting");

        let kind = self.device.kind;
        match bounded(kind, self.io_timeout, self.connection.connect()).await {
            Ok(()) => {
                self.reconnect_attempts = 0;
                self.apply(self.state.to_connected(), None);
                Ok(())
            }
            Err(e) => {
                warn!(device_id = %self.device.id, error = %e, "Connection failed");
                let next = self.state.to_disconnected();
                self.apply(Ok(next), Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Close the connection. Always ends in `Disconnected`.
    pub async fn disconnect(&mut self) {
        let kind = self.device.kind;
        if let Err(e) = bounded(kind, self.io_timeout, self.connection.disconnect()).await {
            warn!(device_id = %self.device.id, error = %e, "Error closing connection");
        }
        self.reconnect_attempts = 0;
        let next = self.state.to_disconnected();
        self.apply(Ok(next), None);
    }

    /// Gate for every device command: `Ok` only when commands may be sent.
    pub async fn ready(&mut self) -> Result<(), HardwareError> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Reconnecting => self.try_reconnect().await,
            _ => Err(HardwareError::DeviceNotConnected(self.device.kind)),
        }
    }

    /// Report a failed command. Drops a `Connected` link to `Reconnecting`
    /// and returns `true`; in any other state only the error is recorded.
    pub fn mark_io_failure(&mut self, error: &HardwareError) -> bool {
        if self.state != ConnectionState::Connected {
            self.last_error = Some(error.to_string());
            return false;
        }
        warn!(device_id = %self.device.id, error = %error, "I/O failure, reconnecting");
        self.reconnect_attempts = 0;
        self.apply(self.state.to_reconnecting(), Some(error.to_string()));
        true
    }

    async fn try_reconnect(&mut self) -> Result<(), HardwareError> {
        self.reconnect_attempts += 1;
        debug!(
            device_id = %self.device.id,
            attempt = self.reconnect_attempts,
            max_attempts = self.max_reconnect_attempts,
            "Reconnect attempt"
        );

        let kind = self.device.kind;
        // Stale handle first; errors closing it are irrelevant
        let _ = bounded(kind, self.io_timeout, self.connection.disconnect()).await;

        match bounded(kind, self.io_timeout, self.connection.connect()).await {
            Ok(()) => {
                info!(device_id = %self.device.id, attempts = self.reconnect_attempts, "Reconnected");
                self.reconnect_attempts = 0;
                self.apply(self.state.to_connected(), None);
                Ok(())
            }
            Err(e) => {
                if self.reconnect_attempts >= self.max_reconnect_attempts {
                    warn!(
                        device_id = %self.device.id,
                        attempts = self.reconnect_attempts,
                        error = %e,
                        "Reconnect attempts exhausted"
                    );
                    self.apply(self.state.to_error(), Some(e.to_string()));
                } else {
                    self.last_error = Some(e.to_string());
                    self.publish();
                }
                Err(HardwareError::DeviceNotConnected(kind))
            }
        }
    }

    fn apply(&mut self, next: Result<ConnectionState, &'static str>, error: Option<String>) {
        let next = match next {
            Ok(next) => next,
            Err(reason) => {
                warn!(device_id = %self.device.id, state = ?self.state, "Transition rejected: {}", reason);
                return;
            }
        };

        let previous = self.state;
        self.state = next;
        if next == ConnectionState::Connected {
            self.session += 1;
        }
        if error.is_some() || next == ConnectionState::Connected {
            self.last_error = error;
        }

        info!(
            device_id = %self.device.id,
            kind = %self.device.kind,
            from = ?previous,
            to = ?next,
            "Connection state changed"
        );
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(DeviceStatus {
            device_id: self.device.id.clone(),
            kind: self.device.kind,
            state: self.state,
            last_error: self.last_error.clone(),
        });
    }
}
