//! Platform media services
//!
//! Device enumeration, capture handles and the encoder all come from the host
//! platform. [`MediaPlatform`] is the seam; [`SyntheticPlatform`] is a
//! deterministic implementation producing test-pattern video and tone audio.

mod encoder;
mod synthetic;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::CaptureResult;
use crate::media::{CaptureConstraints, CombinedStream, DeviceDescriptor, MediaStreamHandle};
use crate::recorder::{Codec, EncodedChunk};

pub use encoder::SyntheticEncoder;
pub use synthetic::SyntheticPlatform;

/// What the user is asked to share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplaySurface {
    /// Full desktop
    #[default]
    Monitor,
    /// A single application window
    Window,
    /// The current browser tab
    BrowserTab,
}

/// Display-share request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayRequest {
    pub surface: DisplaySurface,
    /// Also capture the shared surface's audio
    pub capture_audio: bool,
}

/// Host media services
///
/// Acquisition calls may suspend while the user answers a consent prompt.
#[async_trait::async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Platform name for logging
    fn name(&self) -> &str;

    /// List capture endpoints in platform order
    async fn enumerate_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>>;

    /// Open a camera matching the constraints
    async fn open_camera(&self, constraints: &CaptureConstraints) -> CaptureResult<MediaStreamHandle>;

    /// Ask the user to pick a screen, window or tab to share
    async fn open_display(&self, request: &DisplayRequest) -> CaptureResult<MediaStreamHandle>;

    /// Open a microphone (`None` = platform default)
    async fn open_microphone(&self, device_id: Option<&str>) -> CaptureResult<MediaStreamHandle>;

    /// Whether the encoder accepts the given MIME type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Codec used when no preference can be honoured, if any
    fn default_codec(&self) -> Option<Codec>;

    fn create_encoder(
        &self,
        codec: &Codec,
        timeslice: Option<Duration>,
    ) -> CaptureResult<Box<dyn MediaEncoder>>;
}

/// Incremental encoder for a combined stream
#[async_trait::async_trait]
pub trait MediaEncoder: Send {
    /// Start encoding
    ///
    /// Returns a receiver yielding chunks in emission order. The channel closes
    /// after the final chunk has been sent.
    async fn start(&mut self, stream: CombinedStream) -> CaptureResult<mpsc::Receiver<EncodedChunk>>;

    /// Request a flush; the final chunk follows on the channel, then it closes
    async fn stop(&mut self) -> CaptureResult<()>;

    /// Encoder name for logging
    fn name(&self) -> &str;
}
