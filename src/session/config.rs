use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::compositor::DEFAULT_OUTPUT_FRAME_RATE;
use crate::config::Config;
use crate::media::CaptureConstraints;
use crate::platform::DisplayRequest;
use crate::recorder::{RecorderConfig, DEFAULT_FILE_NAME};
use crate::video::Resolution;

const DEFAULT_REFRESH_RATE_HZ: f64 = 60.0;

/// Fastest render cadence accepted from configuration
pub const MAX_REFRESH_RATE_HZ: f64 = 1000.0;

/// Configuration for one capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Composite surface size
    pub canvas: Resolution,

    /// Compositor render rate (display refresh)
    pub refresh_rate_hz: f64,

    /// Frame rate of the composite stream given to the encoder
    pub output_frame_rate: u32,

    /// Try to show the camera picture-in-picture
    pub camera_enabled: bool,

    /// Camera to open (`None` = first listed)
    pub camera_device_id: Option<String>,

    pub camera_constraints: CaptureConstraints,

    /// Microphone to open (`None` = first listed); a start request may override it
    pub microphone_device_id: Option<String>,

    /// Abort the attempt instead of recording video-only when the microphone fails
    pub require_audio: bool,

    /// Artifact file name
    pub file_name: String,

    /// Chunk emission interval (`None` = one chunk at stop)
    pub timeslice: Option<Duration>,

    /// Display request used when a start request does not specify one
    #[serde(skip)]
    pub display: DisplayRequest,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            canvas: Resolution::new(1280, 720),
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            output_frame_rate: DEFAULT_OUTPUT_FRAME_RATE,
            camera_enabled: true,
            camera_device_id: None,
            camera_constraints: CaptureConstraints::default(),
            microphone_device_id: None,
            require_audio: false,
            file_name: DEFAULT_FILE_NAME.to_string(),
            timeslice: Some(Duration::from_secs(1)),
            display: DisplayRequest::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_config(cfg: &Config) -> Self {
        let timeslice = match cfg.recording.timeslice_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Self {
            canvas: Resolution::new(cfg.capture.canvas_width, cfg.capture.canvas_height),
            refresh_rate_hz: cfg.capture.refresh_rate_hz,
            output_frame_rate: cfg.capture.output_frame_rate,
            camera_enabled: cfg.capture.camera_enabled,
            camera_device_id: cfg.devices.camera.clone(),
            camera_constraints: cfg.capture.camera.clone(),
            microphone_device_id: cfg.devices.microphone.clone(),
            require_audio: cfg.recording.require_audio,
            file_name: cfg.recording.file_name.clone(),
            timeslice,
            display: DisplayRequest {
                surface: cfg.recording.display_surface,
                capture_audio: cfg.recording.capture_display_audio,
            },
            ..Self::default()
        }
    }

    /// Time between compositor renders.
    ///
    /// The rate is clamped to 1..=`MAX_REFRESH_RATE_HZ`; a non-finite rate falls
    /// back to the default, so the period is never zero.
    pub fn refresh_period(&self) -> Duration {
        let hz = if self.refresh_rate_hz.is_finite() {
            self.refresh_rate_hz.clamp(1.0, MAX_REFRESH_RATE_HZ)
        } else {
            DEFAULT_REFRESH_RATE_HZ
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            file_name: self.file_name.clone(),
            timeslice: self.timeslice,
        }
    }
}
