use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::media::CaptureConstraints;
use crate::platform::DisplaySurface;
use crate::recorder::DEFAULT_FILE_NAME;

/// Environment variable prefix, e.g. `SCREENCAM__RECORDING__FILE_NAME`
const ENV_PREFIX: &str = "SCREENCAM";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub devices: DevicesConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "screencam".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Compositor render rate
    pub refresh_rate_hz: f64,
    /// Frame rate of the stream handed to the encoder
    pub output_frame_rate: u32,
    pub camera_enabled: bool,
    pub camera: CaptureConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            refresh_rate_hz: 60.0,
            output_frame_rate: 30,
            camera_enabled: true,
            camera: CaptureConstraints::default(),
        }
    }
}

/// Explicit device choices; unset means "first listed device"
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    pub camera: Option<String>,
    pub microphone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub file_name: String,
    pub output_dir: PathBuf,
    /// Chunk emission interval; 0 emits a single chunk at stop
    pub timeslice_ms: u64,
    /// Abort the recording attempt when no microphone can be opened
    pub require_audio: bool,
    pub display_surface: DisplaySurface,
    pub capture_display_audio: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            output_dir: PathBuf::from("recordings"),
            timeslice_ms: 1000,
            require_audio: false,
            display_surface: DisplaySurface::Monitor,
            capture_display_audio: false,
        }
    }
}

impl Config {
    /// Load from a config file (any format the `config` crate knows), then environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Defaults plus environment overrides, no file
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()
            .context("Failed to read environment configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();

        assert_eq!(cfg.service.name, "screencam");
        assert_eq!(cfg.capture.output_frame_rate, 30);
        assert_eq!(cfg.recording.file_name, "test.webm");
        assert_eq!(cfg.recording.timeslice_ms, 1000);
        assert!(cfg.devices.microphone.is_none());
        assert!(!cfg.recording.require_audio);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("screencam.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[capture]
canvas_width = 300
canvas_height = 150

[devices]
microphone = "usb-mic"

[recording]
file_name = "demo.webm"
display_surface = "browser-tab"
"#
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.capture.canvas_width, 300);
        assert_eq!(cfg.capture.canvas_height, 150);
        assert_eq!(cfg.capture.refresh_rate_hz, 60.0);
        assert_eq!(cfg.devices.microphone.as_deref(), Some("usb-mic"));
        assert_eq!(cfg.recording.file_name, "demo.webm");
        assert_eq!(cfg.recording.display_surface, DisplaySurface::BrowserTab);
        assert_eq!(cfg.capture.camera, CaptureConstraints::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/screencam").is_err());
    }
}
