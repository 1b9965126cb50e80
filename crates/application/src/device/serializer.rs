use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-device FIFO command queue.
///
/// `with_device` runs its closure only after every earlier call for the same
/// device id has completed; calls for different ids run concurrently. The
/// queue is a fair tokio mutex per id, so waiters are served in call order.
#[derive(Clone, Default)]
pub struct DeviceCommandSerializer {
    queues: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DeviceCommandSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_device<F, Fut, T>(&self, device_id: &str, command: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let queue = self
            .queues
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _turn = queue.lock().await;
        command().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_device_runs_in_call_order() {
        let serializer = DeviceCommandSerializer::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for i in 0..4u64 {
            let serializer = serializer.clone();
            let log = log.clone();
            tasks.push(tokio::spawn(async move {
                serializer
                    .with_device("printer-01", || async {
                        log.lock().unwrap().push(format!("begin {}", i));
                        // Earlier commands take longer; order must still hold
                        tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                        log.lock().unwrap().push(format!("end {}", i));
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "begin 0", "end 0", "begin 1", "end 1", "begin 2", "end 2", "begin 3", "end 3"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_devices_overlap() {
        let serializer = DeviceCommandSerializer::new();
        let started = tokio::time::Instant::now();

        let slow = |id: &'static str| {
            let serializer = serializer.clone();
            async move {
                serializer
                    .with_device(id, || tokio::time::sleep(Duration::from_millis(100)))
                    .await
            }
        };

        tokio::join!(slow("scale-01"), slow("printer-01"));
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}
