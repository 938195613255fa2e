use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};
use crate::video::Resolution;

/// Kind of capture endpoint reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    /// Microphone or line-in
    AudioInput,
    /// Camera
    VideoInput,
    /// Speakers; reported by some platforms but never captured from
    AudioOutput,
}

/// Snapshot of one capture endpoint from a single enumeration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque, stable device identifier
    pub id: String,
    pub kind: DeviceKind,
    /// Human readable name (may be empty before permission is granted)
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }

    /// Label for display, falling back to the id when the label is withheld
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// Capture endpoints partitioned by kind, in platform order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceList {
    pub audio_inputs: Vec<DeviceDescriptor>,
    pub video_inputs: Vec<DeviceDescriptor>,
}

impl DeviceList {
    /// Partition raw descriptors by kind, keeping their relative order.
    /// Output endpoints are dropped.
    pub fn partition(devices: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        let mut list = DeviceList::default();

        for device in devices {
            match device.kind {
                DeviceKind::AudioInput => list.audio_inputs.push(device),
                DeviceKind::VideoInput => list.video_inputs.push(device),
                DeviceKind::AudioOutput => {}
            }
        }

        list
    }

    pub fn is_empty(&self) -> bool {
        self.audio_inputs.is_empty() && self.video_inputs.is_empty()
    }
}

/// Min / ideal / max bound for one constrained dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

impl Range {
    pub const fn new(min: u32, ideal: u32, max: u32) -> Self {
        Self { min, ideal, max }
    }

    fn validate(&self, name: &str) -> CaptureResult<()> {
        if self.min > self.max {
            return Err(CaptureError::Overconstrained(format!(
                "{} min {} exceeds max {}",
                name, self.min, self.max
            )));
        }
        if self.ideal < self.min || self.ideal > self.max {
            return Err(CaptureError::Overconstrained(format!(
                "{} ideal {} outside [{}, {}]",
                name, self.ideal, self.min, self.max
            )));
        }
        Ok(())
    }

    /// Pick a value for a device whose largest supported value is `capability`.
    ///
    /// Returns `None` when the device cannot reach the minimum.
    pub fn resolve(&self, capability: u32) -> Option<u32> {
        if capability < self.min {
            return None;
        }
        Some(self.ideal.min(self.max).min(capability))
    }
}

/// Desired camera properties, used only at acquisition time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    /// Specific device to open (`None` = platform default)
    #[serde(skip)]
    pub device_id: Option<String>,
    pub width: Range,
    pub height: Range,
    /// Target frame rate in frames per second
    pub frame_rate: f64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            width: Range::new(100, 1280, 1920),
            height: Range::new(100, 720, 1080),
            frame_rate: 30.0,
        }
    }
}

impl CaptureConstraints {
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Reject constraints that no device could ever satisfy
    pub fn validate(&self) -> CaptureResult<()> {
        self.width.validate("width")?;
        self.height.validate("height")?;
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(CaptureError::Overconstrained(format!(
                "frame rate {} must be positive",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Resolution a device with the given native maximum would deliver
    pub fn resolve(&self, native: Resolution) -> CaptureResult<Resolution> {
        let width = self.width.resolve(native.width);
        let height = self.height.resolve(native.height);

        match (width, height) {
            (Some(width), Some(height)) => Ok(Resolution::new(width, height)),
            _ => Err(CaptureError::Overconstrained(format!(
                "device maximum {} below requested minimum {}x{}",
                native, self.width.min, self.height.min
            ))),
        }
    }
}
