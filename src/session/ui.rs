use tracing::{info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::media::DeviceList;
use crate::recorder::Codec;
use crate::video::VideoFeed;

/// Where a preview feed should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSlot {
    Camera,
    Screen,
}

/// Contract with the host UI.
///
/// The session only relies on mount/unmount; everything else is informational.
pub trait SessionUi: Send + Sync {
    /// Create the container the previews are mounted into
    fn mount(&self) -> CaptureResult<()>;

    /// Release the container
    fn unmount(&self) -> CaptureResult<()>;

    /// Device lists for the pickers
    fn show_devices(&self, _devices: &DeviceList) {}

    fn attach_preview(&self, _slot: PreviewSlot, _feed: VideoFeed) {}

    fn recording_started(&self, _codec: &Codec) {}

    fn report_error(&self, _error: &CaptureError) {}
}

/// Headless UI that logs what a real overlay would display
#[derive(Debug, Default)]
pub struct LogUi;

impl SessionUi for LogUi {
    fn mount(&self) -> CaptureResult<()> {
        info!("UI mounted");
        Ok(())
    }

    fn unmount(&self) -> CaptureResult<()> {
        info!("UI unmounted");
        Ok(())
    }

    fn show_devices(&self, devices: &DeviceList) {
        if devices.is_empty() {
            info!("No capture devices listed");
        }
        for device in &devices.video_inputs {
            info!("Camera: {} ({})", device.display_name(), device.id);
        }
        for device in &devices.audio_inputs {
            info!("Microphone: {} ({})", device.display_name(), device.id);
        }
    }

    fn attach_preview(&self, slot: PreviewSlot, _feed: VideoFeed) {
        info!("Preview attached: {:?}", slot);
    }

    fn recording_started(&self, codec: &Codec) {
        info!("Recording ({})", codec);
    }

    fn report_error(&self, error: &CaptureError) {
        if error.is_user_facing() {
            warn!("{}", error);
        }
    }
}
