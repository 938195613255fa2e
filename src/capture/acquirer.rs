use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{CaptureError, CaptureResult};
use crate::media::{CaptureConstraints, MediaStreamHandle, TrackControl, TrackKind};
use crate::platform::{DisplayRequest, MediaPlatform};

/// Why a stream was acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    Camera,
    Display,
    Microphone,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamRole::Camera => "camera",
            StreamRole::Display => "display",
            StreamRole::Microphone => "microphone",
        };
        f.write_str(name)
    }
}

struct HeldStream {
    role: StreamRole,
    stream_id: String,
    controls: Vec<TrackControl>,
}

/// Opens capture handles and keeps track of every one it handed out.
///
/// Handles can be moved to other owners; the acquirer keeps their track
/// controls so it can always release them.
pub struct StreamAcquirer {
    platform: Arc<dyn MediaPlatform>,
    held: Vec<HeldStream>,
}

impl StreamAcquirer {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self {
            platform,
            held: Vec::new(),
        }
    }

    /// Open a camera. `device_id` overrides any id in the constraints.
    pub async fn acquire_video(
        &mut self,
        device_id: Option<&str>,
        constraints: &CaptureConstraints,
    ) -> CaptureResult<MediaStreamHandle> {
        constraints.validate()?;

        let mut constraints = constraints.clone();
        if let Some(id) = device_id {
            constraints.device_id = Some(id.to_string());
        }

        let stream = self.platform.open_camera(&constraints).await?;
        self.accept(StreamRole::Camera, TrackKind::Video, stream)
    }

    /// Ask the user for a screen, window or tab
    pub async fn acquire_display(&mut self, request: &DisplayRequest) -> CaptureResult<MediaStreamHandle> {
        let stream = self.platform.open_display(request).await?;
        self.accept(StreamRole::Display, TrackKind::Video, stream)
    }

    pub async fn acquire_audio(&mut self, device_id: Option<&str>) -> CaptureResult<MediaStreamHandle> {
        let stream = self.platform.open_microphone(device_id).await?;
        self.accept(StreamRole::Microphone, TrackKind::Audio, stream)
    }

    fn accept(
        &mut self,
        role: StreamRole,
        kind: TrackKind,
        stream: MediaStreamHandle,
    ) -> CaptureResult<MediaStreamHandle> {
        if !stream.has_live_track(kind) {
            stream.stop();
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} stream has no live {:?} track",
                role, kind
            )));
        }

        info!(
            "Acquired {} stream {} ({} tracks)",
            role,
            stream.id(),
            stream.tracks().len()
        );

        self.held.push(HeldStream {
            role,
            stream_id: stream.id().to_string(),
            controls: stream.controls(),
        });

        Ok(stream)
    }

    /// Stop every track of streams acquired for `role`. Returns the number of streams released.
    pub fn release(&mut self, role: StreamRole) -> usize {
        let (released, kept): (Vec<_>, Vec<_>) =
            self.held.drain(..).partition(|held| held.role == role);
        self.held = kept;

        for held in &released {
            stop_all(held);
        }

        released.len()
    }

    /// Stop every track this acquirer handed out
    pub fn release_all(&mut self) -> usize {
        let released: Vec<_> = self.held.drain(..).collect();

        for held in &released {
            stop_all(held);
        }

        if !released.is_empty() {
            info!("Released {} streams", released.len());
        }

        released.len()
    }

    /// Streams currently held
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn is_holding(&self, role: StreamRole) -> bool {
        self.held.iter().any(|held| held.role == role)
    }

    /// Tracks handed out and not ended
    pub fn live_track_count(&self) -> usize {
        self.held
            .iter()
            .flat_map(|held| held.controls.iter())
            .filter(|c| !c.is_ended())
            .count()
    }
}

fn stop_all(held: &HeldStream) {
    let live = held.controls.iter().filter(|c| !c.is_ended()).count();
    for control in &held.controls {
        control.stop();
    }
    if live == 0 {
        debug!("{} stream {} had already ended", held.role, held.stream_id);
    }
}
