use crate::HardwareEvent;
use async_trait::async_trait;

/// Sink failure; sinks range from stdout to test doubles
pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Delivery of hardware events to whoever listens on the station
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: HardwareEvent) -> Result<(), PublishError>;
}
