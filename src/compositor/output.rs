use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

use super::Compositor;
use crate::media::{MediaStreamHandle, MediaTrack, TrackControl};
use crate::video::video_channel;

/// Frame rate of the composite output stream
pub const DEFAULT_OUTPUT_FRAME_RATE: u32 = 30;

/// Fastest output rate; keeps the capture period above zero
pub const MAX_OUTPUT_FRAME_RATE: u32 = 240;

impl Compositor {
    /// Capture the surface as a video stream at a fixed frame rate.
    ///
    /// The stream ends when its track is stopped or the compositor shuts down.
    pub fn capture_stream(&self, frame_rate: u32) -> MediaStreamHandle {
        let control = TrackControl::child_of(&self.shutdown);
        let (publisher, feed) = video_channel();

        let ended = control.token();
        let surface = self.surface.clone();
        let counters = self.counters.clone();
        let period = Duration::from_secs_f64(1.0 / frame_rate.clamp(1, MAX_OUTPUT_FRAME_RATE) as f64);

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = ended.cancelled() => break,
                    _ = ticker.tick() => {
                        let frame = surface.lock().snapshot(started.elapsed());
                        publisher.publish(frame);
                        counters.frames_captured.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            debug!("Composite output stream ended");
        });

        MediaStreamHandle::new().with_track(MediaTrack::video("composite", control, feed))
    }
}
