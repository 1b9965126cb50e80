use async_trait::async_trait;
use domain::HardwareEvent;
use domain::event::{EventPublisher, PublishError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each event as one JSON document per line (stdout for the agent)
pub struct JsonLinesPublisher<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesPublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> EventPublisher for JsonLinesPublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, event: HardwareEvent) -> Result<(), PublishError> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        // One lock per line keeps concurrent publishers from interleaving bytes
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Emits events into the log stream only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: HardwareEvent) -> Result<(), PublishError> {
        tracing::debug!(event = event.event_type(), ?event, "Hardware event");
        Ok(())
    }
}
