use async_trait::async_trait;
use domain::HardwareEvent;
use domain::event::{EventPublisher, PublishError};
use std::sync::Arc;

/// Fans each event out to every sink. A failing sink is logged and skipped;
/// the event counts as lost only when no sink accepted it.
#[derive(Default)]
pub struct CompositeEventPublisher {
    sinks: Vec<Arc<dyn EventPublisher>>,
}

impl CompositeEventPublisher {
    pub fn new(sinks: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventPublisher for CompositeEventPublisher {
    async fn publish(&self, event: HardwareEvent) -> Result<(), PublishError> {
        let mut failed = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event.clone()).await {
                failed += 1;
                tracing::error!(event = event.event_type(), error = %e, "Event sink failed");
            }
        }

        if failed > 0 && failed == self.sinks.len() {
            return Err(format!("All {} event sinks failed", failed).into());
        }
        Ok(())
    }
}
