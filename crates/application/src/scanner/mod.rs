pub mod camera_session;
pub mod disambiguator;

pub use camera_session::{CameraDecodeSession, CameraSessionHandle, SessionOutcome};
pub use disambiguator::{DisambiguatorConfig, KeyEvent, KeystrokeBuffer, KeystrokeDisambiguator};
