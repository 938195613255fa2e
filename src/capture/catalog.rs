use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::media::DeviceList;
use crate::platform::MediaPlatform;

/// Read-only view of the platform's capture endpoints
pub struct DeviceCatalog {
    platform: Arc<dyn MediaPlatform>,
}

impl DeviceCatalog {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self { platform }
    }

    /// Enumerate audio and video inputs, each in platform order.
    ///
    /// Any platform failure is reported as `Enumeration`; callers are expected
    /// to carry on with blind acquisition.
    pub async fn list_devices(&self) -> CaptureResult<DeviceList> {
        let devices = self.platform.enumerate_devices().await.map_err(|e| {
            warn!("Device enumeration failed on {}: {}", self.platform.name(), e);
            match e {
                CaptureError::Enumeration(_) => e,
                other => CaptureError::Enumeration(other.to_string()),
            }
        })?;

        let list = DeviceList::partition(devices);

        info!(
            "Found {} audio inputs, {} video inputs",
            list.audio_inputs.len(),
            list.video_inputs.len()
        );

        Ok(list)
    }
}
