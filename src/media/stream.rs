use futures::future::join_all;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use super::track::{MediaTrack, TrackControl, TrackKind};
use crate::video::VideoFeed;

/// An open capture session: one or more tracks with a single owner.
///
/// Dropping a handle does not release the device; owners call [`stop`]
/// (or the acquirer's release) explicitly.
///
/// [`stop`]: MediaStreamHandle::stop
#[derive(Debug)]
pub struct MediaStreamHandle {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStreamHandle {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: MediaTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_track(&mut self, track: MediaTrack) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    /// Whether at least one track of `kind` has not ended
    pub fn has_live_track(&self, kind: TrackKind) -> bool {
        self.tracks_of(kind).any(MediaTrack::is_live)
    }

    /// Reader for the first video track
    pub fn video_feed(&self) -> Option<VideoFeed> {
        self.tracks_of(TrackKind::Video).find_map(MediaTrack::video_feed)
    }

    pub fn controls(&self) -> Vec<TrackControl> {
        self.tracks.iter().map(|t| t.control().clone()).collect()
    }

    /// A stream is active while any of its tracks is live
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Stop every track
    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Future resolving once every track has ended.
    ///
    /// Independent of the handle's lifetime so it can be moved into a watcher task.
    pub fn inactive(&self) -> impl Future<Output = ()> + Send + 'static {
        let tokens: Vec<CancellationToken> =
            self.tracks.iter().map(|t| t.control().token()).collect();

        async move {
            join_all(tokens.iter().map(CancellationToken::cancelled)).await;
        }
    }

    pub fn into_tracks(self) -> Vec<MediaTrack> {
        self.tracks
    }
}

impl Default for MediaStreamHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The composited video output plus any attached audio tracks, ready for encoding
#[derive(Debug)]
pub struct CombinedStream {
    inner: MediaStreamHandle,
}

impl CombinedStream {
    pub fn new(video: MediaStreamHandle) -> Self {
        Self { inner: video }
    }

    pub fn attach(&mut self, track: MediaTrack) {
        self.inner.add_track(track);
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn has_video(&self) -> bool {
        self.inner.has_live_track(TrackKind::Video)
    }

    pub fn audio_track_count(&self) -> usize {
        self.inner.tracks_of(TrackKind::Audio).count()
    }

    pub fn video_track_count(&self) -> usize {
        self.inner.tracks_of(TrackKind::Video).count()
    }

    pub fn controls(&self) -> Vec<TrackControl> {
        self.inner.controls()
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn into_tracks(self) -> Vec<MediaTrack> {
        self.inner.into_tracks()
    }
}
