use async_trait::async_trait;
use domain::HardwareError;
use domain::camera::{CameraInfo, CameraProvider, FrameDecoder};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What the next decoded frame yields
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Blank,
    Code(String),
    Fault(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    frames: VecDeque<Frame>,
    unavailable: Option<String>,
    opened: Vec<String>,
    decoded_frames: usize,
}

/// Camera provider that replays scripted frames. Used by the tests and
/// by stations without a camera attached (no devices enumerated).
#[derive(Clone, Default)]
pub struct ScriptedCamera {
    devices: Vec<CameraInfo>,
    state: Arc<Mutex<ScriptState>>,
    frame_delay: Duration,
}

impl ScriptedCamera {
    pub fn new(devices: Vec<CameraInfo>) -> Self {
        Self {
            devices,
            ..Default::default()
        }
    }

    /// Each decode attempt takes this long
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_blank(&self, count: usize) {
        let mut state = self.lock();
        state.frames.extend(std::iter::repeat_n(Frame::Blank, count));
    }

    pub fn push_code(&self, code: impl Into<String>) {
        self.lock().frames.push_back(Frame::Code(code.into()));
    }

    pub fn push_fault(&self, reason: impl Into<String>) {
        self.lock().frames.push_back(Frame::Fault(reason.into()));
    }

    /// Acquisition fails (permission denied, device busy)
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.lock().unavailable = reason.map(str::to_string);
    }

    /// Ids of cameras opened so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    pub fn decoded_frames(&self) -> usize {
        self.lock().decoded_frames
    }
}

#[async_trait]
impl CameraProvider for ScriptedCamera {
    async fn enumerate(&self) -> Result<Vec<CameraInfo>, HardwareError> {
        Ok(self.devices.clone())
    }

    async fn open(&self, camera: &CameraInfo) -> Result<Box<dyn FrameDecoder>, HardwareError> {
        let mut state = self.lock();
        if let Some(reason) = &state.unavailable {
            return Err(HardwareError::CameraUnavailable(reason.clone()));
        }
        state.opened.push(camera.id.clone());
        Ok(Box::new(ScriptedDecoder {
            state: self.state.clone(),
            frame_delay: self.frame_delay,
        }))
    }
}

struct ScriptedDecoder {
    state: Arc<Mutex<ScriptState>>,
    frame_delay: Duration,
}

#[async_trait]
impl FrameDecoder for ScriptedDecoder {
    async fn decode_frame(&mut self) -> Result<Option<String>, HardwareError> {
        if !self.frame_delay.is_zero() {
            tokio::time::sleep(self.frame_delay).await;
        }

        let frame = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.decoded_frames += 1;
            state.frames.pop_front()
        };

        match frame {
            Some(Frame::Code(code)) => Ok(Some(code)),
            Some(Frame::Fault(reason)) => Err(HardwareError::CameraUnavailable(reason)),
            Some(Frame::Blank) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_frames_in_order() {
        let camera = ScriptedCamera::new(vec![CameraInfo::new("cam-0", "Back Camera")]);
        camera.push_blank(2);
        camera.push_code("PKG-42");

        let devices = camera.enumerate().await.unwrap();
        let mut decoder = camera.open(&devices[0]).await.unwrap();

        assert_eq!(decoder.decode_frame().await.unwrap(), None);
        assert_eq!(decoder.decode_frame().await.unwrap(), None);
        assert_eq!(
            decoder.decode_frame().await.unwrap().as_deref(),
            Some("PKG-42")
        );
        assert_eq!(decoder.decode_frame().await.unwrap(), None);
        assert_eq!(camera.opened(), vec!["cam-0".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_camera_fails_open() {
        let camera = ScriptedCamera::new(vec![CameraInfo::new("cam-0", "USB")]);
        camera.set_unavailable(Some("Permission denied"));

        let devices = camera.enumerate().await.unwrap();
        let result = camera.open(&devices[0]).await;
        assert!(matches!(result, Err(HardwareError::CameraUnavailable(_))));
        assert!(camera.opened().is_empty());
    }
}
