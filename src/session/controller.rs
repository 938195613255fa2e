use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::events::{SessionEvent, StartRequest};
use super::state::SessionState;
use super::stats::{RecordingOutcome, SessionStats};
use super::ui::{PreviewSlot, SessionUi};
use crate::audio::merge_acquired;
use crate::capture::{DeviceCatalog, StreamAcquirer, StreamRole};
use crate::compositor::{Compositor, RenderLoop};
use crate::error::{CaptureError, CaptureResult};
use crate::media::{DeviceList, MediaStreamHandle, TrackControl, TrackKind};
use crate::platform::MediaPlatform;
use crate::recorder::{Artifact, ArtifactSink, Recorder, StopHandle};

/// Result of a teardown pass
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    /// Streams released by the acquirer
    pub released_streams: usize,
    /// Steps that failed; later steps still ran
    pub errors: Vec<String>,
}

/// A failed recording attempt, and whether the session can survive it
struct AttemptFailure {
    error: CaptureError,
    fatal: bool,
}

impl From<CaptureError> for AttemptFailure {
    fn from(error: CaptureError) -> Self {
        Self { error, fatal: false }
    }
}

/// Coordinates one capture session from initialization to teardown.
///
/// Owns the compositor, the render loop, every acquired stream and the
/// recorder; nothing here is process-global.
pub struct SessionController {
    config: SessionConfig,
    platform: Arc<dyn MediaPlatform>,
    ui: Arc<dyn SessionUi>,
    sink: Arc<dyn ArtifactSink>,

    catalog: DeviceCatalog,
    acquirer: StreamAcquirer,

    state: SessionState,
    devices: DeviceList,
    enumeration_failed: bool,
    ui_mounted: bool,

    compositor: Option<Compositor>,
    render_loop: Option<RenderLoop>,
    output_controls: Vec<TrackControl>,

    recorder: Option<Recorder>,
    stop_handle: Option<StopHandle>,
    display_watch: Option<JoinHandle<()>>,

    started_at: DateTime<Utc>,
    recording_started_at: Option<DateTime<Utc>>,
    audio_degraded: bool,
    chunks_count: usize,
    outcome: RecordingOutcome,
    teardown_errors: Vec<String>,
}

impl SessionController {
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        ui: Arc<dyn SessionUi>,
        sink: Arc<dyn ArtifactSink>,
        config: SessionConfig,
    ) -> Self {
        info!(
            "Creating capture session {} on {} platform",
            config.session_id,
            platform.name()
        );

        Self {
            catalog: DeviceCatalog::new(Arc::clone(&platform)),
            acquirer: StreamAcquirer::new(Arc::clone(&platform)),
            config,
            platform,
            ui,
            sink,
            state: SessionState::Idle,
            devices: DeviceList::default(),
            enumeration_failed: false,
            ui_mounted: false,
            compositor: None,
            render_loop: None,
            output_controls: Vec::new(),
            recorder: None,
            stop_handle: None,
            display_watch: None,
            started_at: Utc::now(),
            recording_started_at: None,
            audio_degraded: false,
            chunks_count: 0,
            outcome: RecordingOutcome::NotRecorded,
            teardown_errors: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Devices found during initialization (empty if enumeration failed)
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn compositor(&self) -> Option<&Compositor> {
        self.compositor.as_ref()
    }

    /// Mount the UI, discover devices, open the camera and start compositing.
    ///
    /// Enumeration and camera failures are tolerated. Anything else tears the
    /// session down.
    pub async fn initialize(&mut self) -> CaptureResult<()> {
        if self.state != SessionState::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot initialize session while {}",
                self.state
            )));
        }

        if let Err(e) = self.prepare().await {
            error!("Session initialization failed: {}", e);
            self.ui.report_error(&e);
            self.teardown().await;
            return Err(e);
        }

        self.state = SessionState::Ready;
        info!("Session {} ready", self.config.session_id);

        Ok(())
    }

    async fn prepare(&mut self) -> CaptureResult<()> {
        self.ui.mount()?;
        self.ui_mounted = true;

        self.devices = match self.catalog.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Continuing without device list: {}", e);
                self.enumeration_failed = true;
                DeviceList::default()
            }
        };
        self.ui.show_devices(&self.devices);

        let compositor = Compositor::new(self.config.canvas)?;

        if self.config.camera_enabled {
            self.open_camera(&compositor).await;
        }

        self.render_loop = Some(compositor.spawn_render_loop(self.config.refresh_period()));
        self.compositor = Some(compositor);

        Ok(())
    }

    async fn open_camera(&mut self, compositor: &Compositor) {
        // An empty list from a successful enumeration means there is no camera
        if !self.enumeration_failed && self.devices.video_inputs.is_empty() {
            info!("No camera found, recording screen only");
            return;
        }

        let device_id = self
            .config
            .camera_device_id
            .clone()
            .or_else(|| self.devices.video_inputs.first().map(|d| d.id.clone()));

        match self
            .acquirer
            .acquire_video(device_id.as_deref(), &self.config.camera_constraints)
            .await
        {
            Ok(camera) => {
                if let Some(feed) = camera.video_feed() {
                    compositor.attach_camera(feed.clone());
                    self.ui.attach_preview(PreviewSlot::Camera, feed);
                }
            }
            Err(e) => {
                warn!("Camera unavailable, recording screen only: {}", e);
                self.ui.report_error(&e);
            }
        }
    }

    /// Ask for a screen, merge audio and start recording.
    ///
    /// A failed attempt releases what it acquired and returns the session to
    /// `Ready`, unless there is no video to record at all.
    pub async fn start_recording(&mut self, request: StartRequest) -> CaptureResult<()> {
        if self.recording_started_at.is_some() {
            return Err(CaptureError::InvalidState(
                "session already made its recording".to_string(),
            ));
        }
        if self.state != SessionState::Ready {
            return Err(CaptureError::InvalidState(format!(
                "cannot start recording while {}",
                self.state
            )));
        }

        self.state = SessionState::AwaitingSelection;

        match self.begin_recording(request).await {
            Ok(()) => {
                self.state = SessionState::Recording;
                self.recording_started_at = Some(Utc::now());
                Ok(())
            }
            Err(failure) => {
                warn!("Recording attempt failed: {}", failure.error);
                self.ui.report_error(&failure.error);
                self.abort_attempt();

                if failure.fatal {
                    self.teardown().await;
                } else {
                    self.state = SessionState::Ready;
                }
                Err(failure.error)
            }
        }
    }

    async fn begin_recording(&mut self, request: StartRequest) -> Result<(), AttemptFailure> {
        let compositor = self
            .compositor
            .clone()
            .ok_or_else(|| CaptureError::InvalidState("compositor not running".to_string()))?;

        let display_request = request.display.unwrap_or_else(|| self.config.display.clone());
        let display = self.acquirer.acquire_display(&display_request).await?;
        let display_ended = display.inactive();

        if let Some(feed) = display.video_feed() {
            compositor.attach_screen(feed.clone());
            self.ui.attach_preview(PreviewSlot::Screen, feed);
        }

        let output = compositor.capture_stream(self.config.output_frame_rate);
        self.output_controls = output.controls();

        let microphone = self.acquire_microphone(request.microphone_device_id).await?;

        // System audio that came with the share is recorded as its own track
        let mut display_audio = MediaStreamHandle::new();
        for track in display.into_tracks() {
            if track.kind() == TrackKind::Audio {
                display_audio.add_track(track);
            }
        }

        let mut audio_sources = vec![microphone];
        if !display_audio.tracks().is_empty() {
            audio_sources.push(Ok(display_audio));
        }

        let (combined, report) = merge_acquired(output, audio_sources);
        self.audio_degraded = report.degraded;

        if !combined.has_video() {
            return Err(AttemptFailure {
                error: CaptureError::DeviceUnavailable("combined stream has no video".to_string()),
                fatal: true,
            });
        }

        let mut recorder = Recorder::new(Arc::clone(&self.platform), self.config.recorder_config());
        let codec = recorder.arm(combined)?;
        recorder.start().await?;

        let stop_handle = recorder.stop_handle();
        let watcher = stop_handle.clone();
        self.display_watch = Some(tokio::spawn(async move {
            display_ended.await;
            if watcher.stop() {
                info!("Screen share ended, stopping recording");
            }
        }));

        self.ui.recording_started(&codec);
        self.stop_handle = Some(stop_handle);
        self.recorder = Some(recorder);

        Ok(())
    }

    async fn acquire_microphone(
        &mut self,
        requested: Option<String>,
    ) -> Result<CaptureResult<MediaStreamHandle>, AttemptFailure> {
        let device_id = requested
            .or_else(|| self.config.microphone_device_id.clone())
            .or_else(|| self.devices.audio_inputs.first().map(|d| d.id.clone()));

        let result = self.acquirer.acquire_audio(device_id.as_deref()).await;

        if let Err(e) = &result {
            if self.config.require_audio {
                return Err(e.clone().into());
            }
            self.ui.report_error(e);
        }

        Ok(result)
    }

    /// Undo a failed attempt's acquisitions, keeping camera and preview
    fn abort_attempt(&mut self) {
        for control in self.output_controls.drain(..) {
            control.stop();
        }
        if let Some(compositor) = &self.compositor {
            compositor.detach_screen();
        }
        self.acquirer.release(StreamRole::Display);
        self.acquirer.release(StreamRole::Microphone);
        self.recorder = None;
        self.stop_handle = None;
    }

    /// Request the recording to stop. Returns `true` if this call initiated it.
    pub fn stop_recording(&self) -> bool {
        match &self.stop_handle {
            Some(handle) => handle.stop(),
            None => false,
        }
    }

    /// Wait for the recorder to finalize, hand the artifact off, then tear down
    pub async fn finish_recording(&mut self) -> CaptureResult<RecordingOutcome> {
        if self.state != SessionState::Recording {
            return Err(CaptureError::InvalidState(format!(
                "cannot finish recording while {}",
                self.state
            )));
        }

        let recorder = self
            .recorder
            .as_mut()
            .ok_or_else(|| CaptureError::InvalidState("no recording in progress".to_string()))?;

        let result = recorder.finished().await;
        Ok(self.finalize(result).await)
    }

    async fn finalize(&mut self, result: CaptureResult<Artifact>) -> RecordingOutcome {
        let outcome = self.settle(result).await;
        self.teardown().await;
        outcome
    }

    /// Record the recorder's result and deliver the artifact, once
    async fn settle(&mut self, result: CaptureResult<Artifact>) -> RecordingOutcome {
        self.chunks_count = self.recorder.as_ref().map_or(0, Recorder::chunk_count);
        self.state = SessionState::Finalized;

        let outcome = match result {
            Ok(artifact) => self.deliver(artifact).await,
            Err(CaptureError::EmptyRecording) => {
                info!("Recording produced no data, nothing to save");
                RecordingOutcome::Empty
            }
            Err(e) => {
                error!("Recording failed: {}", e);
                self.ui.report_error(&e);
                RecordingOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.outcome = outcome.clone();
        outcome
    }

    async fn deliver(&mut self, artifact: Artifact) -> RecordingOutcome {
        let saved = RecordingOutcome::Saved {
            file_name: artifact.file_name.clone(),
            media_type: artifact.media_type.clone(),
            size_bytes: artifact.size_bytes,
            chunk_count: artifact.chunk_count,
        };

        info!(
            "Handing {} ({} bytes) to {} sink",
            artifact.file_name,
            artifact.size_bytes,
            self.sink.name()
        );

        match self.sink.deliver(artifact).await {
            Ok(()) => saved,
            Err(e) => {
                error!("Failed to deliver artifact: {}", e);
                self.ui.report_error(&e);
                RecordingOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Release everything: render loop, streams, then the UI container.
    ///
    /// A running recording is stopped and delivered first. Every step runs
    /// even if an earlier one failed. Calling it again is a no-op.
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if self.state == SessionState::TornDown {
            return report;
        }

        info!("Tearing down session {}", self.config.session_id);

        // 0. Recording still running
        if self.state == SessionState::Recording {
            self.stop_recording();
            if let Some(recorder) = self.recorder.as_mut() {
                let result = recorder.finished().await;
                self.settle(result).await;
            }
        }

        // 1. Compositor loop
        if let Some(mut render_loop) = self.render_loop.take() {
            if let Err(e) = render_loop.cancel().await {
                report.errors.push(e.to_string());
            }
        }
        if let Some(compositor) = &self.compositor {
            compositor.shutdown();
        }

        // 2. Stream handles
        if let Some(stop_handle) = &self.stop_handle {
            stop_handle.stop();
        }
        if let Some(watch) = self.display_watch.take() {
            watch.abort();
        }
        for control in self.output_controls.drain(..) {
            control.stop();
        }
        report.released_streams = self.acquirer.release_all();

        // 3. UI container
        if self.ui_mounted {
            match self.ui.unmount() {
                Ok(()) => self.ui_mounted = false,
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        for e in &report.errors {
            warn!("Teardown step failed: {}", e);
        }
        self.teardown_errors.extend(report.errors.iter().cloned());
        self.state = SessionState::TornDown;

        report
    }

    /// Drive the session from UI events until it is torn down.
    ///
    /// A closed event channel stops any running recording, saves it, and tears down.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> SessionStats {
        let mut events_open = true;

        loop {
            let recording = self.state == SessionState::Recording;

            if !events_open && !recording {
                self.teardown().await;
                break;
            }

            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(SessionEvent::Init) => {
                        if self.initialize().await.is_err() {
                            break;
                        }
                    }
                    Some(SessionEvent::Start(request)) => {
                        if let Err(e) = self.start_recording(request).await {
                            debug!("Start request rejected: {}", e);
                            if self.state == SessionState::TornDown {
                                break;
                            }
                        }
                    }
                    Some(SessionEvent::Stop) => {
                        if recording {
                            self.stop_recording();
                        } else {
                            info!("Stop received without a recording, closing session");
                            self.teardown().await;
                            break;
                        }
                    }
                    None => {
                        events_open = false;
                        if recording {
                            self.stop_recording();
                        }
                    }
                },

                result = wait_for_recorder(&mut self.recorder), if recording => {
                    self.finalize(result).await;
                    break;
                }
            }
        }

        self.stats()
    }

    pub fn stats(&self) -> SessionStats {
        let now = Utc::now();
        let chunks_count = match &self.recorder {
            Some(recorder) if self.state == SessionState::Recording => recorder.chunk_count(),
            _ => self.chunks_count,
        };

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: now.signed_duration_since(self.started_at).num_milliseconds() as f64 / 1000.0,
            recording_started_at: self.recording_started_at,
            chunks_count,
            audio_degraded: self.audio_degraded,
            compositor: self
                .compositor
                .as_ref()
                .map(Compositor::stats)
                .unwrap_or_default(),
            outcome: self.outcome.clone(),
            teardown_errors: self.teardown_errors.clone(),
        }
    }
}

/// Run one session on `platform`, driven by `events`, until it is torn down
pub async fn run_session(
    platform: Arc<dyn MediaPlatform>,
    ui: Arc<dyn SessionUi>,
    sink: Arc<dyn ArtifactSink>,
    config: SessionConfig,
    events: mpsc::Receiver<SessionEvent>,
) -> SessionStats {
    SessionController::new(platform, ui, sink, config)
        .run(events)
        .await
}

async fn wait_for_recorder(recorder: &mut Option<Recorder>) -> CaptureResult<Artifact> {
    match recorder {
        Some(recorder) => recorder.finished().await,
        None => std::future::pending().await,
    }
}
