use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::encoder::SyntheticEncoder;
use super::{DisplayRequest, DisplaySurface, MediaEncoder, MediaPlatform};
use crate::audio::{AudioFeed, AudioStreamSource, ToneGenerator};
use crate::error::{CaptureError, CaptureResult};
use crate::media::{CaptureConstraints, DeviceDescriptor, DeviceKind, MediaStreamHandle, MediaTrack, TrackControl};
use crate::recorder::Codec;
use crate::video::{video_channel, Resolution, VideoFeed, VideoFrame};

const CAMERA_PALETTE: [[u8; 4]; 3] = [[40, 160, 220, 255], [60, 200, 120, 255], [230, 180, 50, 255]];
const DISPLAY_PALETTE: [[u8; 4]; 2] = [[245, 245, 245, 255], [30, 30, 40, 255]];

const AUDIO_SAMPLE_RATE: u32 = 48000;
const AUDIO_BUFFER_MS: u64 = 100;

/// Scripted acquisition failures
#[derive(Debug, Default)]
struct Failures {
    enumeration: Option<CaptureError>,
    camera: Option<CaptureError>,
    display: Option<CaptureError>,
    microphone: Option<CaptureError>,
    encoder: Option<CaptureError>,
}

/// Track handed out by the platform, kept so tests can end or inspect it
struct OpenedTrack {
    kind: DeviceKind,
    display: bool,
    control: TrackControl,
}

/// Deterministic media platform.
///
/// Cameras and displays publish solid-colour test patterns at their frame
/// rate, microphones publish a sine tone, and the encoder is a
/// [`SyntheticEncoder`]. Failures, codec support and encoder output can be
/// scripted.
pub struct SyntheticPlatform {
    devices: Vec<DeviceDescriptor>,
    camera_native: Resolution,
    display_resolution: Resolution,
    display_frame_rate: f64,
    supported_types: Vec<String>,
    default_codec: Option<Codec>,
    withhold_labels: bool,
    labels_granted: AtomicBool,
    failures: Mutex<Failures>,
    script: Mutex<Option<Vec<Vec<u8>>>>,
    opened: Mutex<Vec<OpenedTrack>>,
}

impl SyntheticPlatform {
    /// One camera, two microphones, one speaker; VP9 and VP8 supported
    pub fn new() -> Self {
        Self {
            devices: vec![
                DeviceDescriptor::new("synthetic-mic-0", DeviceKind::AudioInput, "Built-in Microphone"),
                DeviceDescriptor::new("synthetic-cam-0", DeviceKind::VideoInput, "Synthetic Camera"),
                DeviceDescriptor::new("synthetic-spk-0", DeviceKind::AudioOutput, "Built-in Speakers"),
                DeviceDescriptor::new("synthetic-mic-1", DeviceKind::AudioInput, "USB Microphone"),
            ],
            camera_native: Resolution::new(1920, 1080),
            display_resolution: Resolution::new(1280, 720),
            display_frame_rate: 30.0,
            supported_types: vec![
                Codec::Vp9.mime_type().to_string(),
                Codec::Vp8.mime_type().to_string(),
            ],
            default_codec: Some(Codec::Native {
                mime_type: "video/webm".to_string(),
            }),
            withhold_labels: false,
            labels_granted: AtomicBool::new(false),
            failures: Mutex::new(Failures::default()),
            script: Mutex::new(None),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_devices(mut self, devices: Vec<DeviceDescriptor>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_camera_resolution(mut self, native: Resolution) -> Self {
        self.camera_native = native;
        self
    }

    pub fn with_display(mut self, resolution: Resolution, frame_rate: f64) -> Self {
        self.display_resolution = resolution;
        self.display_frame_rate = frame_rate;
        self
    }

    pub fn with_supported_types(mut self, types: &[&str]) -> Self {
        self.supported_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_default_codec(mut self, codec: Option<Codec>) -> Self {
        self.default_codec = codec;
        self
    }

    /// Report empty labels until some device has been opened
    pub fn withholding_labels(mut self) -> Self {
        self.withhold_labels = true;
        self
    }

    /// Encoder emits these payloads, one per timeslice, for the next recording
    pub fn with_scripted_chunks(self, chunks: Vec<Vec<u8>>) -> Self {
        *self.script.lock() = Some(chunks);
        self
    }

    pub fn with_enumeration_failure(self, error: CaptureError) -> Self {
        self.failures.lock().enumeration = Some(error);
        self
    }

    pub fn with_camera_failure(self, error: CaptureError) -> Self {
        self.failures.lock().camera = Some(error);
        self
    }

    pub fn with_display_failure(self, error: CaptureError) -> Self {
        self.failures.lock().display = Some(error);
        self
    }

    pub fn with_microphone_failure(self, error: CaptureError) -> Self {
        self.failures.lock().microphone = Some(error);
        self
    }

    pub fn with_encoder_failure(self, error: CaptureError) -> Self {
        self.failures.lock().encoder = Some(error);
        self
    }

    /// Clear a scripted display failure (the user accepts the next prompt)
    pub fn allow_display(&self) {
        self.failures.lock().display = None;
    }

    /// Simulate the user ending the share from the platform's own controls
    pub fn end_display_share(&self) {
        let opened = self.opened.lock();
        for track in opened.iter().filter(|t| t.display) {
            track.control.stop();
        }
        info!("Synthetic display share ended by user");
    }

    /// Tracks handed out so far
    pub fn opened_track_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Tracks handed out and not yet stopped
    pub fn live_track_count(&self) -> usize {
        self.opened
            .lock()
            .iter()
            .filter(|t| !t.control.is_ended())
            .count()
    }

    /// Live tracks of one device kind
    pub fn live_tracks_of(&self, kind: DeviceKind) -> usize {
        self.opened
            .lock()
            .iter()
            .filter(|t| t.kind == kind && !t.control.is_ended())
            .count()
    }

    fn register(&self, kind: DeviceKind, display: bool, control: &TrackControl) {
        self.labels_granted.store(true, Ordering::SeqCst);
        self.opened.lock().push(OpenedTrack {
            kind,
            display,
            control: control.clone(),
        });
    }

    fn find_device(&self, kind: DeviceKind, device_id: Option<&str>) -> CaptureResult<&DeviceDescriptor> {
        let mut candidates = self.devices.iter().filter(|d| d.kind == kind);

        match device_id {
            Some(id) => candidates
                .find(|d| d.id == id)
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no device with id {}", id))),
            None => candidates
                .next()
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no {:?} device", kind))),
        }
    }
}

impl Default for SyntheticPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaPlatform for SyntheticPlatform {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn enumerate_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let failure = self.failures.lock().enumeration.clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let hide = self.withhold_labels && !self.labels_granted.load(Ordering::SeqCst);
        Ok(self
            .devices
            .iter()
            .map(|d| {
                let mut device = d.clone();
                if hide {
                    device.label.clear();
                }
                device
            })
            .collect())
    }

    async fn open_camera(&self, constraints: &CaptureConstraints) -> CaptureResult<MediaStreamHandle> {
        let failure = self.failures.lock().camera.clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let device = self.find_device(DeviceKind::VideoInput, constraints.device_id.as_deref())?;
        let resolution = constraints.resolve(self.camera_native)?;

        let control = TrackControl::new();
        let feed = spawn_pattern_source(
            device.label.clone(),
            resolution,
            constraints.frame_rate,
            &CAMERA_PALETTE,
            control.token(),
        );
        self.register(DeviceKind::VideoInput, false, &control);

        info!("Synthetic camera opened: {} at {}", device.display_name(), resolution);

        Ok(MediaStreamHandle::new().with_track(MediaTrack::video(device.label.clone(), control, feed)))
    }

    async fn open_display(&self, request: &DisplayRequest) -> CaptureResult<MediaStreamHandle> {
        let failure = self.failures.lock().display.clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let label = match request.surface {
            DisplaySurface::Monitor => "Screen 1",
            DisplaySurface::Window => "Window",
            DisplaySurface::BrowserTab => "Current Tab",
        };

        let control = TrackControl::new();
        let feed = spawn_pattern_source(
            label.to_string(),
            self.display_resolution,
            self.display_frame_rate,
            &DISPLAY_PALETTE,
            control.token(),
        );
        self.register(DeviceKind::VideoInput, true, &control);

        let mut stream = MediaStreamHandle::new().with_track(MediaTrack::video(label, control, feed));

        if request.capture_audio {
            let control = TrackControl::new();
            let feed = spawn_tone_source(220.0, AudioStreamSource::System, control.token());
            self.register(DeviceKind::AudioInput, true, &control);
            stream.add_track(MediaTrack::audio(format!("{} audio", label), control, feed));
        }

        info!("Synthetic display opened: {} at {}", label, self.display_resolution);

        Ok(stream)
    }

    async fn open_microphone(&self, device_id: Option<&str>) -> CaptureResult<MediaStreamHandle> {
        let failure = self.failures.lock().microphone.clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let device = self.find_device(DeviceKind::AudioInput, device_id)?;

        let control = TrackControl::new();
        let feed = spawn_tone_source(440.0, AudioStreamSource::Microphone, control.token());
        self.register(DeviceKind::AudioInput, false, &control);

        info!("Synthetic microphone opened: {}", device.display_name());

        Ok(MediaStreamHandle::new().with_track(MediaTrack::audio(device.label.clone(), control, feed)))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        let wanted = normalize_mime(mime_type);
        self.supported_types
            .iter()
            .any(|t| normalize_mime(t) == wanted)
    }

    fn default_codec(&self) -> Option<Codec> {
        self.default_codec.clone()
    }

    fn create_encoder(
        &self,
        codec: &Codec,
        timeslice: Option<Duration>,
    ) -> CaptureResult<Box<dyn MediaEncoder>> {
        let failure = self.failures.lock().encoder.clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let mut encoder = SyntheticEncoder::new(codec.clone(), timeslice);
        if let Some(script) = self.script.lock().take() {
            encoder = encoder.with_script(script);
        }

        Ok(Box::new(encoder))
    }
}

/// `video/webm; codecs=vp9` and `video/webm;codecs=vp9` name the same type
fn normalize_mime(mime: &str) -> String {
    mime.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Publish a cycling solid-colour pattern until the track ends
fn spawn_pattern_source(
    label: String,
    resolution: Resolution,
    frame_rate: f64,
    palette: &[[u8; 4]],
    ended: CancellationToken,
) -> VideoFeed {
    let (publisher, feed) = video_channel();
    let frames: Vec<VideoFrame> = palette
        .iter()
        .map(|rgba| VideoFrame::solid(resolution, *rgba, Duration::ZERO))
        .collect();
    let period = Duration::from_secs_f64(1.0 / frame_rate.max(1.0));
    let frames_per_colour = frame_rate.max(1.0) as usize;

    tokio::spawn(async move {
        let started = Instant::now();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut count = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = ended.cancelled() => break,
                _ = ticker.tick() => {
                    let frame = &frames[(count / frames_per_colour) % frames.len()];
                    publisher.publish(frame.retimed(started.elapsed()));
                    count += 1;
                }
            }
        }

        debug!("Video source stopped: {} ({} frames)", label, count);
    });

    feed
}

/// Publish 100ms tone buffers until the track ends
fn spawn_tone_source(frequency_hz: f64, source: AudioStreamSource, ended: CancellationToken) -> AudioFeed {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut tone = ToneGenerator::new(frequency_hz, AUDIO_SAMPLE_RATE, 1);
        let mut ticker = interval(Duration::from_millis(AUDIO_BUFFER_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut timestamp_ms = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = ended.cancelled() => break,
                _ = ticker.tick() => {
                    let frame = tone.next_frame(AUDIO_BUFFER_MS, timestamp_ms, source);
                    timestamp_ms += AUDIO_BUFFER_MS;

                    match tx.try_send(frame) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            debug!("Audio consumer lagging, dropping buffer at {}ms", timestamp_ms);
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }
        }

        debug!("Audio source stopped: {:?}", source);
    });

    rx
}
