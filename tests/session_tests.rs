// Integration tests for the capture session
//
// These tests drive a full session on the synthetic platform: device
// discovery, camera preview, screen selection, recording and teardown.
// The clock is paused so timeslices are deterministic.

use anyhow::Result;
use parking_lot::Mutex;
use screencam::error::{CaptureError, CaptureResult};
use screencam::media::DeviceKind;
use screencam::platform::SyntheticPlatform;
use screencam::recorder::MemorySink;
use screencam::session::{
    PreviewSlot, RecordingOutcome, SessionConfig, SessionController, SessionEvent, SessionState,
    SessionUi, StartRequest,
};
use screencam::video::{Resolution, VideoFeed};
use screencam::DeviceDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn test_platform() -> SyntheticPlatform {
    SyntheticPlatform::new()
        .with_camera_resolution(Resolution::new(320, 180))
        .with_display(Resolution::new(128, 72), 10.0)
}

fn test_config() -> SessionConfig {
    SessionConfig {
        canvas: Resolution::new(64, 36),
        refresh_rate_hz: 20.0,
        output_frame_rate: 10,
        timeslice: Some(Duration::from_secs(1)),
        ..SessionConfig::default()
    }
}

fn scripted(chunks: &[&[u8]]) -> Vec<Vec<u8>> {
    chunks.iter().map(|c| c.to_vec()).collect()
}

/// Records what the session shows, optionally failing to unmount
#[derive(Default)]
struct RecordingUi {
    fail_unmount: bool,
    calls: Mutex<Vec<String>>,
    previews: Mutex<Vec<PreviewSlot>>,
    errors: Mutex<Vec<CaptureError>>,
}

impl RecordingUi {
    fn failing_unmount() -> Self {
        Self {
            fail_unmount: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl SessionUi for RecordingUi {
    fn mount(&self) -> CaptureResult<()> {
        self.calls.lock().push("mount".to_string());
        Ok(())
    }

    fn unmount(&self) -> CaptureResult<()> {
        self.calls.lock().push("unmount".to_string());
        if self.fail_unmount {
            return Err(CaptureError::InvalidState("container already gone".to_string()));
        }
        Ok(())
    }

    fn attach_preview(&self, slot: PreviewSlot, _feed: VideoFeed) {
        self.previews.lock().push(slot);
    }

    fn report_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }
}

struct Harness {
    platform: Arc<SyntheticPlatform>,
    ui: Arc<RecordingUi>,
    sink: Arc<MemorySink>,
    session: SessionController,
}

fn harness(platform: SyntheticPlatform, ui: RecordingUi, config: SessionConfig) -> Harness {
    let platform = Arc::new(platform);
    let ui = Arc::new(ui);
    let sink = Arc::new(MemorySink::new());
    let session = SessionController::new(platform.clone(), ui.clone(), sink.clone(), config);

    Harness {
        platform,
        ui,
        sink,
        session,
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_records_and_saves_concatenated_chunks() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(scripted(&[b"c1", b"c2"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    assert_eq!(h.session.state(), SessionState::Ready);
    assert_eq!(*h.ui.previews.lock(), vec![PreviewSlot::Camera]);

    h.session.start_recording(StartRequest::default()).await?;
    assert_eq!(h.session.state(), SessionState::Recording);
    assert_eq!(*h.ui.previews.lock(), vec![PreviewSlot::Camera, PreviewSlot::Screen]);

    // Two timeslices pass, then the user clicks stop
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(h.session.stop_recording());
    assert!(!h.session.stop_recording(), "Second stop must be a no-op");

    let outcome = h.session.finish_recording().await?;
    assert_eq!(
        outcome,
        RecordingOutcome::Saved {
            file_name: "test.webm".to_string(),
            media_type: "video/webm".to_string(),
            size_bytes: 4,
            chunk_count: 2,
        }
    );

    let artifacts = h.sink.artifacts().await;
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].bytes, b"c1c2".to_vec());

    assert_eq!(h.session.state(), SessionState::TornDown);
    assert_eq!(h.platform.live_track_count(), 0, "Every track should be stopped");
    assert_eq!(h.ui.calls(), vec!["mount", "unmount"]);

    let stats = h.session.stats();
    assert_eq!(stats.chunks_count, 2);
    assert!(!stats.audio_degraded);
    assert!(stats.recording_started_at.is_some());
    assert!(stats.compositor.frames_rendered > 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_camera_failure_still_records_screen() -> Result<()> {
    let platform = test_platform()
        .with_camera_failure(CaptureError::DeviceUnavailable("camera in use".to_string()))
        .with_scripted_chunks(scripted(&[b"screen"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    assert_eq!(h.session.state(), SessionState::Ready);
    assert!(h.ui.previews.lock().is_empty());
    assert_eq!(h.ui.errors.lock().len(), 1, "Camera failure should be reported");

    h.session.start_recording(StartRequest::default()).await?;
    assert_eq!(h.session.state(), SessionState::Recording);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.session.stop_recording();

    let outcome = h.session.finish_recording().await?;
    assert!(matches!(outcome, RecordingOutcome::Saved { .. }));
    assert_eq!(h.sink.delivery_count().await, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_no_camera_listed_skips_camera() -> Result<()> {
    let platform = test_platform().with_devices(vec![DeviceDescriptor::new(
        "mic-only",
        DeviceKind::AudioInput,
        "Headset",
    )]);
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;

    assert_eq!(h.session.state(), SessionState::Ready);
    assert_eq!(h.session.devices().video_inputs.len(), 0);
    assert_eq!(h.platform.opened_track_count(), 0, "No camera should be opened");
    assert!(h.ui.errors.lock().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_enumeration_failure_still_tries_default_camera() -> Result<()> {
    let platform = test_platform()
        .with_enumeration_failure(CaptureError::Enumeration("backend offline".to_string()));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;

    assert_eq!(h.session.state(), SessionState::Ready);
    assert!(h.session.devices().is_empty());
    assert_eq!(h.platform.live_tracks_of(DeviceKind::VideoInput), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_display_share_ended_finalizes_once() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(scripted(&[b"c1", b"c2"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    h.session.start_recording(StartRequest::default()).await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.platform.end_display_share();

    let outcome = h.session.finish_recording().await?;

    // c1 at the first timeslice, c2 from the flush at stop
    assert!(matches!(outcome, RecordingOutcome::Saved { chunk_count: 2, .. }));
    assert_eq!(h.sink.delivery_count().await, 1);
    assert_eq!(h.session.state(), SessionState::TornDown);

    // A late stop request after the share ended changes nothing
    assert!(!h.session.stop_recording());
    assert_eq!(h.sink.delivery_count().await, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_empty_recording_is_not_delivered() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(Vec::new());
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    h.session.start_recording(StartRequest::default()).await?;

    // Stop before the first timeslice; the final flush is empty
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.session.stop_recording();

    let outcome = h.session.finish_recording().await?;

    assert_eq!(outcome, RecordingOutcome::Empty);
    assert_eq!(h.sink.delivery_count().await, 0);
    assert_eq!(h.session.state(), SessionState::TornDown);
    assert!(h.ui.errors.lock().is_empty(), "Empty recording is not an error for the user");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_refused_share_returns_to_ready_and_retry_works() -> Result<()> {
    let platform = test_platform()
        .with_display_failure(CaptureError::PermissionDenied("share refused".to_string()))
        .with_scripted_chunks(scripted(&[b"retry"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;

    let result = h.session.start_recording(StartRequest::default()).await;
    assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
    assert_eq!(h.session.state(), SessionState::Ready);

    // Camera survives, nothing else is held
    assert_eq!(h.platform.live_track_count(), 1);
    assert_eq!(h.platform.live_tracks_of(DeviceKind::VideoInput), 1);

    h.platform.allow_display();
    h.session.start_recording(StartRequest::default()).await?;
    assert_eq!(h.session.state(), SessionState::Recording);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.session.stop_recording();
    let outcome = h.session.finish_recording().await?;
    assert!(matches!(outcome, RecordingOutcome::Saved { size_bytes: 5, .. }));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_codec_releases_attempt() -> Result<()> {
    let platform = test_platform()
        .with_supported_types(&[])
        .with_default_codec(None);
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;

    let result = h.session.start_recording(StartRequest::default()).await;
    assert!(matches!(result, Err(CaptureError::CodecUnsupported(_))));
    assert_eq!(h.session.state(), SessionState::Ready);

    // Display and microphone released, camera kept for the preview
    assert_eq!(h.platform.live_track_count(), 1);
    assert!(!h.session.compositor().map_or(true, |c| c.has_screen()));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_microphone_failure_degrades_to_video_only() -> Result<()> {
    let platform = test_platform()
        .with_microphone_failure(CaptureError::PermissionDenied("mic blocked".to_string()))
        .with_scripted_chunks(scripted(&[b"video"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    h.session.start_recording(StartRequest::default()).await?;

    assert_eq!(h.session.state(), SessionState::Recording);
    assert!(h.session.stats().audio_degraded);

    h.session.stop_recording();
    h.session.finish_recording().await?;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_required_audio_aborts_attempt() -> Result<()> {
    let platform = test_platform()
        .with_microphone_failure(CaptureError::PermissionDenied("mic blocked".to_string()));
    let config = SessionConfig {
        require_audio: true,
        ..test_config()
    };
    let mut h = harness(platform, RecordingUi::default(), config);

    h.session.initialize().await?;

    let result = h.session.start_recording(StartRequest::default()).await;
    assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
    assert_eq!(h.session.state(), SessionState::Ready);
    assert_eq!(h.platform.live_tracks_of(DeviceKind::VideoInput), 1, "Only the camera stays open");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_explicit_microphone_choice_is_used() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(scripted(&[b"a"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;

    let result = h
        .session
        .start_recording(StartRequest {
            display: None,
            microphone_device_id: Some("no-such-mic".to_string()),
        })
        .await;

    // An unknown microphone degrades rather than failing the attempt
    assert!(result.is_ok());
    assert!(h.session.stats().audio_degraded);

    h.session.stop_recording();
    h.session.finish_recording().await?;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_ready_session() -> Result<()> {
    let mut h = harness(test_platform(), RecordingUi::default(), test_config());

    let result = h.session.start_recording(StartRequest::default()).await;
    assert!(matches!(result, Err(CaptureError::InvalidState(_))));
    assert_eq!(h.session.state(), SessionState::Idle);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_second_recording_is_rejected() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(scripted(&[b"once"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    h.session.start_recording(StartRequest::default()).await?;

    let again = h.session.start_recording(StartRequest::default()).await;
    assert!(matches!(again, Err(CaptureError::InvalidState(_))));
    assert_eq!(h.session.state(), SessionState::Recording);

    h.session.stop_recording();
    h.session.finish_recording().await?;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_teardown_continues_past_failing_unmount() -> Result<()> {
    let mut h = harness(test_platform(), RecordingUi::failing_unmount(), test_config());

    h.session.initialize().await?;
    assert_eq!(h.platform.live_track_count(), 1);

    let report = h.session.teardown().await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.released_streams, 1);
    assert_eq!(h.platform.live_track_count(), 0);
    assert!(h.session.compositor().map_or(false, |c| c.is_shut_down()));
    assert_eq!(h.session.state(), SessionState::TornDown);
    assert_eq!(h.session.stats().teardown_errors.len(), 1);

    // Repeat teardown is a no-op
    let again = h.session.teardown().await;
    assert!(again.errors.is_empty());
    assert_eq!(h.ui.calls(), vec!["mount", "unmount"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_event_loop_records_until_stop() -> Result<()> {
    let platform = Arc::new(test_platform().with_scripted_chunks(scripted(&[b"c1", b"c2"])));
    let sink = Arc::new(MemorySink::new());
    let session = SessionController::new(
        platform.clone(),
        Arc::new(RecordingUi::default()),
        sink.clone(),
        test_config(),
    );

    let (tx, rx) = mpsc::channel(8);
    let driver = tokio::spawn(session.run(rx));

    tx.send(SessionEvent::Init).await?;
    tx.send(SessionEvent::Start(StartRequest::default())).await?;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    tx.send(SessionEvent::Stop).await?;

    let stats = driver.await?;

    assert_eq!(stats.state, SessionState::TornDown);
    assert!(matches!(stats.outcome, RecordingOutcome::Saved { chunk_count: 2, .. }));
    assert_eq!(sink.delivery_count().await, 1);
    assert_eq!(platform.live_track_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_event_loop_closed_before_recording_tears_down() -> Result<()> {
    let platform = Arc::new(test_platform());
    let sink = Arc::new(MemorySink::new());
    let session = SessionController::new(
        platform.clone(),
        Arc::new(RecordingUi::default()),
        sink.clone(),
        test_config(),
    );

    let (tx, rx) = mpsc::channel(8);
    let driver = tokio::spawn(session.run(rx));

    tx.send(SessionEvent::Init).await?;
    drop(tx);

    let stats = driver.await?;

    assert_eq!(stats.state, SessionState::TornDown);
    assert_eq!(stats.outcome, RecordingOutcome::NotRecorded);
    assert_eq!(sink.delivery_count().await, 0);
    assert_eq!(platform.live_track_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_recording_saves_once() -> Result<()> {
    let platform = test_platform().with_scripted_chunks(scripted(&[b"c1", b"c2"]));
    let mut h = harness(platform, RecordingUi::default(), test_config());

    h.session.initialize().await?;
    h.session.start_recording(StartRequest::default()).await?;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Closing the session mid-recording still stops, saves, then unwinds
    let report = h.session.teardown().await;
    assert!(report.errors.is_empty());

    let stats = h.session.stats();
    assert_eq!(stats.state, SessionState::TornDown);
    assert_eq!(stats.chunks_count, 2);
    assert!(matches!(
        stats.outcome,
        RecordingOutcome::Saved { size_bytes: 4, chunk_count: 2, .. }
    ));
    assert_eq!(h.sink.delivery_count().await, 1);
    assert_eq!(h.platform.live_track_count(), 0);

    // The recording was already handed off; nothing more to finish
    let again = h.session.finish_recording().await;
    assert!(matches!(again, Err(CaptureError::InvalidState(_))));
    assert_eq!(h.session.state(), SessionState::TornDown);
    assert_eq!(h.sink.delivery_count().await, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_attempt_without_live_video_tears_down() -> Result<()> {
    let mut h = harness(test_platform(), RecordingUi::default(), test_config());

    h.session.initialize().await?;

    // A shut-down compositor hands out an output track that has already ended
    h.session
        .compositor()
        .expect("compositor is running after initialize")
        .shutdown();

    let result = h.session.start_recording(StartRequest::default()).await;

    assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
    assert_eq!(h.session.state(), SessionState::TornDown);
    assert_eq!(h.platform.live_track_count(), 0, "Camera, display and microphone released");
    assert_eq!(h.sink.delivery_count().await, 0);
    assert_eq!(h.ui.calls(), vec!["mount", "unmount"]);

    Ok(())
}
