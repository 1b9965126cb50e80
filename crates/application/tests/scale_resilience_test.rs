use application::device::DeviceCommandSerializer;
use application::scale::{ScaleController, ScaleSettings};
use application::service::{HardwareService, ScaleConnectRequest};
use application::printer::{PrinterController, PrinterSettings};
use domain::{ConnectionState, DeviceKind, HardwareError};
use infrastructure::{MockPrinter, MockScale};
use std::sync::Arc;
use std::time::Duration;

fn settings() -> ScaleSettings {
    ScaleSettings {
        io_timeout: Duration::from_millis(200),
        failure_threshold: 3,
        max_reconnect_attempts: 2,
        change_threshold_grams: 5.0,
    }
}

async fn connected(scale: &MockScale) -> ScaleController {
    let controller = ScaleController::new(
        "scale-01",
        Box::new(scale.clone()),
        DeviceCommandSerializer::new(),
        settings(),
    );
    assert_eq!(controller.connect(None).await.unwrap(), ConnectionState::Connected);
    controller
}

#[tokio::test]
async fn tare_then_poll_reads_zero() {
    let scale = MockScale::new(742.5);
    let controller = connected(&scale).await;

    controller.tare().await.unwrap();
    let reading = controller.poll().await.unwrap();

    assert!(reading.net_grams().abs() < 1e-9);
    assert_eq!(reading.tare_offset, 742.5);
}

#[tokio::test]
async fn net_weight_never_negative() {
    let scale = MockScale::new(500.0);
    let controller = connected(&scale).await;
    controller.tare().await.unwrap();

    scale.set_grams(350.0);
    assert_eq!(controller.poll().await.unwrap().net_grams(), 0.0);

    scale.set_grams(1500.0);
    assert_eq!(controller.poll().await.unwrap().net_grams(), 1000.0);
}

#[tokio::test]
async fn failure_streak_reconnects_exactly_once() {
    let scale = MockScale::new(1000.0);
    let controller = connected(&scale).await;
    scale.set_unplugged(true);

    let mut states = Vec::new();
    for _ in 0..6 {
        assert!(controller.poll().await.is_err());
        states.push(controller.state());
    }

    assert_eq!(
        states,
        vec![
            ConnectionState::Connected,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Reconnecting,
            ConnectionState::Error,
            ConnectionState::Error,
        ]
    );
    let entered_reconnecting = states
        .windows(2)
        .filter(|w| w[0] == ConnectionState::Connected && w[1] == ConnectionState::Reconnecting)
        .count();
    assert_eq!(entered_reconnecting, 1);
    assert!(controller.current_reading().is_none());
}

#[tokio::test]
async fn polls_in_error_do_not_touch_device() {
    let scale = MockScale::new(1000.0);
    let controller = connected(&scale).await;
    scale.set_unplugged(true);
    for _ in 0..5 {
        let _ = controller.poll().await;
    }
    assert_eq!(controller.state(), ConnectionState::Error);

    let reads = scale.reads();
    let connects = scale.connects();
    assert_eq!(
        controller.poll().await,
        Err(HardwareError::DeviceNotConnected(DeviceKind::Scale))
    );
    assert_eq!(scale.reads(), reads);
    assert_eq!(scale.connects(), connects);

    // Manual recovery
    scale.set_unplugged(false);
    controller.connect(None).await.unwrap();
    assert_eq!(controller.poll().await.unwrap().net_grams(), 1000.0);
}

#[tokio::test]
async fn reconnect_resets_tare() {
    let scale = MockScale::new(300.0);
    let controller = connected(&scale).await;
    controller.tare().await.unwrap();

    scale.fail_next_reads(6);
    for _ in 0..3 {
        assert!(controller.poll().await.is_err());
    }
    assert_eq!(controller.state(), ConnectionState::Reconnecting);

    scale.set_grams(800.0);
    let reading = controller.poll().await.unwrap();
    assert_eq!(controller.state(), ConnectionState::Connected);
    assert_eq!(reading.tare_offset, 0.0);
    assert_eq!(reading.net_grams(), 800.0);
}

#[tokio::test(start_paused = true)]
async fn slow_scale_counts_as_io_failure() {
    let scale = MockScale::new(100.0);
    let controller = connected(&scale).await;
    scale.set_read_delay(Duration::from_secs(5));

    let err = controller.poll().await.unwrap_err();
    assert_eq!(
        err,
        HardwareError::Timeout {
            kind: DeviceKind::Scale,
            timeout_ms: 200
        }
    );
    assert_eq!(err.kind(), "DeviceIOError");
}

#[tokio::test(start_paused = true)]
async fn snapshot_readable_during_poll() {
    let scale = MockScale::new(100.0);
    let controller = Arc::new(connected(&scale).await);
    controller.poll().await.unwrap();

    scale.set_read_delay(Duration::from_millis(150));
    scale.set_grams(900.0);
    let polling = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.poll().await })
    };
    tokio::task::yield_now().await;

    // In-flight poll does not block readers
    assert_eq!(controller.current_reading().unwrap().raw_grams, 100.0);

    polling.await.unwrap().unwrap();
    assert_eq!(controller.current_reading().unwrap().raw_grams, 900.0);
}

#[tokio::test]
async fn service_weight_and_connect() {
    let scale = MockScale::new(2000.0);
    let scale_ctl = Arc::new(ScaleController::new(
        "scale-01",
        Box::new(scale.clone()),
        DeviceCommandSerializer::new(),
        settings(),
    ));
    let printer = Arc::new(PrinterController::new(
        "printer-01",
        Box::new(MockPrinter::new()),
        DeviceCommandSerializer::new(),
        PrinterSettings::default(),
    ));
    let service = HardwareService::new(scale_ctl, printer);

    let err = service.scale_weight().await.unwrap_err();
    assert_eq!(err.kind, "DeviceNotConnected");

    let state = service
        .scale_connect(ScaleConnectRequest {
            port: Some("COM4".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(state.state, ConnectionState::Connected);

    let weight = service.scale_weight().await.unwrap();
    assert_eq!(weight.kilograms, 2.0);

    let tared = service.scale_tare().await.unwrap();
    assert_eq!(tared.grams, 0.0);
    assert_eq!(service.scale_status().state, ConnectionState::Connected);

    assert_eq!(
        service.scale_disconnect().await.state,
        ConnectionState::Disconnected
    );
}
