use application::scanner::{CameraDecodeSession, SessionOutcome};
use domain::camera::{CameraInfo, CameraSelector};
use domain::{HardwareError, ScanSource};
use infrastructure::{CameraConfig, ScriptedCamera};
use std::sync::Arc;
use std::time::Duration;

fn cameras() -> Vec<CameraInfo> {
    vec![
        CameraInfo::new("cam-front", "Integrated Webcam (front)"),
        CameraInfo::new("cam-back", "Back Camera"),
    ]
}

fn session(camera: &ScriptedCamera) -> CameraDecodeSession {
    CameraDecodeSession::new(Arc::new(camera.clone()), Duration::from_millis(20))
}

#[tokio::test(start_paused = true)]
async fn decodes_once_with_rear_camera() {
    let camera = ScriptedCamera::new(cameras());
    camera.push_blank(3);
    camera.push_code("PKG-0042");
    camera.push_code("PKG-0043");
    let session = session(&camera);

    let handle = session.start(&CameraSelector::PreferRear).await.unwrap();
    assert_eq!(handle.camera().id, "cam-back");

    match handle.outcome().await {
        SessionOutcome::Decoded(scan) => {
            assert_eq!(scan.barcode, "PKG-0042");
            assert_eq!(scan.source, ScanSource::Camera);
        }
        other => panic!("expected a decode, got {:?}", other),
    }
    // Torn down after the first result
    assert!(!session.is_active());
    assert_eq!(camera.decoded_frames(), 4);
}

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected() {
    let camera = ScriptedCamera::new(cameras());
    let session = session(&camera);

    let first = session.start(&CameraSelector::PreferRear).await.unwrap();
    let second = session.start(&CameraSelector::PreferRear).await;
    assert!(matches!(second, Err(HardwareError::SessionAlreadyActive)));

    assert!(first.stop());
    assert_eq!(first.outcome().await, SessionOutcome::Cancelled);
    assert!(session.start(&CameraSelector::PreferRear).await.is_ok());
}

#[tokio::test]
async fn falls_back_to_first_camera() {
    let camera = ScriptedCamera::new(vec![
        CameraInfo::new("usb-1", "USB2.0 HD UVC"),
        CameraInfo::new("usb-2", "Logitech C920"),
    ]);
    let session = session(&camera);

    let handle = session.start(&CameraSelector::PreferRear).await.unwrap();
    assert_eq!(handle.camera().id, "usb-1");
    handle.stop();
}

#[tokio::test]
async fn explicit_selection_by_id() {
    let camera = ScriptedCamera::new(cameras());
    let session = session(&camera);

    let handle = session
        .start(&CameraSelector::Id("cam-front".to_string()))
        .await
        .unwrap();
    assert_eq!(handle.camera().id, "cam-front");
    handle.stop();

    let missing = session.start(&CameraSelector::Id("cam-x".to_string())).await;
    assert!(matches!(missing, Err(HardwareError::NoDeviceAvailable)));
}

#[tokio::test]
async fn no_camera_available() {
    let camera = ScriptedCamera::new(Vec::new());
    let session = session(&camera);

    let result = session.start(&CameraSelector::PreferRear).await;
    assert!(matches!(result, Err(HardwareError::NoDeviceAvailable)));
    assert!(!session.is_active());
}

#[tokio::test]
async fn acquisition_failure_ends_session() {
    let camera = ScriptedCamera::new(cameras());
    camera.set_unavailable(Some("Permission denied"));
    let session = session(&camera);

    let result = session.start(&CameraSelector::PreferRear).await;
    assert!(matches!(result, Err(HardwareError::CameraUnavailable(_))));
    assert!(!session.is_active());

    camera.set_unavailable(None);
    assert!(session.start(&CameraSelector::PreferRear).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn stop_during_decode_emits_nothing() {
    let camera = ScriptedCamera::new(cameras()).with_frame_delay(Duration::from_millis(50));
    camera.push_code("LATE-1");
    let session = session(&camera);

    let handle = session.start(&CameraSelector::PreferRear).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(session.stop());

    assert_eq!(handle.outcome().await, SessionOutcome::Cancelled);
    assert!(!session.is_active());
}

#[tokio::test(start_paused = true)]
async fn camera_lost_mid_session() {
    let camera = ScriptedCamera::new(cameras());
    camera.push_blank(2);
    camera.push_fault("Device disconnected");
    let session = session(&camera);

    let handle = session.start(&CameraSelector::PreferRear).await.unwrap();
    match handle.outcome().await {
        SessionOutcome::Failed(HardwareError::CameraUnavailable(reason)) => {
            assert_eq!(reason, "Device disconnected")
        }
        other => panic!("expected camera failure, got {:?}", other),
    }
    assert!(!session.is_active());
}

#[tokio::test(start_paused = true)]
async fn dropped_handle_frees_the_camera() {
    // Empty script: the decoder never finds a code
    let camera = ScriptedCamera::new(cameras());
    let session = session(&camera);

    let handle = session.start(&CameraSelector::PreferRear).await.unwrap();
    assert!(session.is_active());
    drop(handle);

    assert!(!session.is_active());
    let again = session.start(&CameraSelector::PreferRear).await.unwrap();
    assert!(again.stop());
}

#[tokio::test]
async fn frame_interval_from_config() {
    let camera = ScriptedCamera::new(cameras());
    let config = CameraConfig {
        frame_interval_ms: 40,
    };

    let session = CameraDecodeSession::from_config(Arc::new(camera), &config);
    assert_eq!(session.frame_interval(), Duration::from_millis(40));
}
