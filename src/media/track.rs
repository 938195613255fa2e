use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioFeed;
use crate::video::VideoFeed;

/// Media type carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Stop / ended signal shared between a track's owner and its producer.
///
/// Stopping is idempotent. A producer observes the same signal when the
/// platform revokes the device, so both directions end the track the same way.
#[derive(Debug, Clone, Default)]
pub struct TrackControl {
    ended: CancellationToken,
}

impl TrackControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control that also ends when `parent` is cancelled
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            ended: parent.child_token(),
        }
    }

    /// Stop the track and release the underlying device
    pub fn stop(&self) {
        self.ended.cancel();
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_cancelled()
    }

    /// Resolves once the track has ended
    pub async fn ended(&self) {
        self.ended.cancelled().await
    }

    /// Token for producer tasks to select on
    pub fn token(&self) -> CancellationToken {
        self.ended.clone()
    }
}

/// Frame source of a track
#[derive(Debug)]
pub enum TrackFeed {
    /// Latest-frame cell; readers always see the most recent frame
    Video(VideoFeed),
    /// Ordered sample buffers
    Audio(AudioFeed),
}

/// One live track inside a stream handle
#[derive(Debug)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    control: TrackControl,
    feed: TrackFeed,
}

impl MediaTrack {
    pub fn video(label: impl Into<String>, control: TrackControl, feed: VideoFeed) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: TrackKind::Video,
            label: label.into(),
            control,
            feed: TrackFeed::Video(feed),
        }
    }

    pub fn audio(label: impl Into<String>, control: TrackControl, feed: AudioFeed) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: TrackKind::Audio,
            label: label.into(),
            control,
            feed: TrackFeed::Audio(feed),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn control(&self) -> &TrackControl {
        &self.control
    }

    pub fn is_live(&self) -> bool {
        !self.control.is_ended()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Another reader of a video track's frames
    pub fn video_feed(&self) -> Option<VideoFeed> {
        match &self.feed {
            TrackFeed::Video(feed) => Some(feed.clone()),
            TrackFeed::Audio(_) => None,
        }
    }

    pub fn into_parts(self) -> (TrackControl, TrackFeed) {
        (self.control, self.feed)
    }
}
