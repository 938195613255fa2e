// Audio merger for the composited output stream
//
// Attaches audio tracks to the compositor's video output so the encoder sees
// one combined stream. Tracks are attached as-is: no resampling, no mixing,
// no downmix. Several audio sources simply become several tracks.

use tracing::{info, warn};

use crate::error::CaptureResult;
use crate::media::{CombinedStream, MediaStreamHandle, TrackKind};

/// What the merge produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of audio tracks attached
    pub audio_tracks: usize,
    /// True when an audio source was requested but nothing could be attached
    pub degraded: bool,
}

/// Append the audio tracks of every handle onto the video output stream
pub fn merge_audio(
    video: MediaStreamHandle,
    audio: impl IntoIterator<Item = MediaStreamHandle>,
) -> (CombinedStream, MergeReport) {
    let mut combined = CombinedStream::new(video);
    let mut attached = 0;
    let mut requested = 0;

    for handle in audio {
        requested += 1;

        for track in handle.into_tracks() {
            if track.kind() != TrackKind::Audio {
                // Only audio is merged; a stray video track would otherwise leak
                track.stop();
                continue;
            }
            if !track.is_live() {
                warn!("Skipping ended audio track: {}", track.label());
                continue;
            }

            info!("Attaching audio track: {}", track.label());
            combined.attach(track);
            attached += 1;
        }
    }

    let report = MergeReport {
        audio_tracks: attached,
        degraded: requested > 0 && attached == 0,
    };

    if report.degraded {
        warn!("No audio track could be attached, recording video only");
    }

    (combined, report)
}

/// Merge the results of audio acquisitions, degrading to video-only on failure.
///
/// Failed acquisitions are logged and skipped; the report is marked degraded
/// if any of them failed.
pub fn merge_acquired(
    video: MediaStreamHandle,
    audio: impl IntoIterator<Item = CaptureResult<MediaStreamHandle>>,
) -> (CombinedStream, MergeReport) {
    let mut acquired = Vec::new();
    let mut failed = 0;

    for result in audio {
        match result {
            Ok(handle) => acquired.push(handle),
            Err(e) => {
                warn!("Audio source unavailable: {}", e);
                failed += 1;
            }
        }
    }

    let (combined, mut report) = merge_audio(video, acquired);

    if failed > 0 {
        if report.audio_tracks == 0 {
            warn!("Recording video only");
        }
        report.degraded = true;
    }

    (combined, report)
}
