//! Picture-in-picture compositor
//!
//! Draws the latest screen frame across the whole surface and the latest
//! camera frame into the bottom-right third on top of it. The render loop
//! runs at the display refresh rate, independently of the fixed-rate output
//! stream that the recorder consumes.

mod output;
mod render_loop;

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CaptureResult;
use crate::video::{PipLayout, Resolution, Surface, VideoFeed, VideoFrame};

pub use output::{DEFAULT_OUTPUT_FRAME_RATE, MAX_OUTPUT_FRAME_RATE};
pub use render_loop::RenderLoop;

/// Counters shared between the compositor and its tasks
#[derive(Debug, Default)]
struct Counters {
    frames_rendered: AtomicU64,
    draw_failures: AtomicU64,
    frames_captured: AtomicU64,
}

/// Snapshot of compositor activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompositorStats {
    pub frames_rendered: u64,
    pub draw_failures: u64,
    pub frames_captured: u64,
}

#[derive(Default)]
struct Sources {
    screen: Option<VideoFeed>,
    camera: Option<VideoFeed>,
}

/// Composites a screen feed and an optional camera feed onto one surface.
///
/// Cloning yields another handle to the same surface.
#[derive(Clone)]
pub struct Compositor {
    surface: Arc<Mutex<Surface>>,
    layout: PipLayout,
    sources: Arc<Mutex<Sources>>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
}

impl Compositor {
    pub fn new(resolution: Resolution) -> CaptureResult<Self> {
        let surface = Surface::new(resolution)?;
        info!("Compositor surface: {}", resolution);

        Ok(Self {
            surface: Arc::new(Mutex::new(surface)),
            layout: PipLayout::for_surface(resolution.width, resolution.height),
            sources: Arc::new(Mutex::new(Sources::default())),
            counters: Arc::new(Counters::default()),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.surface.lock().resolution()
    }

    pub fn layout(&self) -> PipLayout {
        self.layout
    }

    pub fn attach_screen(&self, feed: VideoFeed) {
        self.sources.lock().screen = Some(feed);
    }

    pub fn detach_screen(&self) {
        self.sources.lock().screen = None;
    }

    pub fn attach_camera(&self, feed: VideoFeed) {
        self.sources.lock().camera = Some(feed);
    }

    pub fn has_screen(&self) -> bool {
        self.sources.lock().screen.is_some()
    }

    /// Draw one composite frame.
    ///
    /// A source without a frame yet is skipped; a source that stopped
    /// producing keeps contributing its last frame. Both layers are attempted
    /// even when the first fails; the first failure is returned.
    pub fn render_frame(&self) -> CaptureResult<()> {
        let (screen, camera) = {
            let sources = self.sources.lock();
            (
                sources.screen.as_ref().and_then(VideoFeed::latest),
                sources.camera.as_ref().and_then(VideoFeed::latest),
            )
        };

        let mut result = Ok(());
        {
            let mut surface = self.surface.lock();

            if let Some(frame) = &screen {
                result = surface.draw_frame(frame, self.layout.screen);
            }
            if let Some(frame) = &camera {
                let camera_result = surface.draw_frame(frame, self.layout.camera);
                if result.is_ok() {
                    result = camera_result;
                }
            }
        }

        self.counters.frames_rendered.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.counters.draw_failures.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    /// Copy of the current surface
    pub fn snapshot(&self, timestamp: Duration) -> VideoFrame {
        self.surface.lock().snapshot(timestamp)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.surface.lock().pixel(x, y)
    }

    pub fn stats(&self) -> CompositorStats {
        CompositorStats {
            frames_rendered: self.counters.frames_rendered.load(Ordering::Relaxed),
            draw_failures: self.counters.draw_failures.load(Ordering::Relaxed),
            frames_captured: self.counters.frames_captured.load(Ordering::Relaxed),
        }
    }

    /// Stop the render loop and every output stream of this compositor
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::video_channel;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];

    #[test]
    fn test_render_without_sources_is_noop() {
        let compositor = Compositor::new(Resolution::new(30, 15)).unwrap();
        assert!(compositor.render_frame().is_ok());
        assert_eq!(compositor.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(compositor.stats().frames_rendered, 1);
    }

    #[test]
    fn test_camera_only_preview_before_screen() {
        let compositor = Compositor::new(Resolution::new(30, 15)).unwrap();
        let (camera_pub, camera_feed) = video_channel();
        compositor.attach_camera(camera_feed);

        camera_pub.publish(VideoFrame::solid(Resolution::new(4, 3), GREEN, Duration::ZERO));
        compositor.render_frame().unwrap();

        assert_eq!(compositor.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(compositor.pixel(25, 12), Some(GREEN));
    }

    #[test]
    fn test_stale_input_is_redrawn() {
        let compositor = Compositor::new(Resolution::new(30, 15)).unwrap();
        let (screen_pub, screen_feed) = video_channel();
        compositor.attach_screen(screen_feed);

        screen_pub.publish(VideoFrame::solid(Resolution::new(8, 4), RED, Duration::ZERO));
        drop(screen_pub);

        for _ in 0..3 {
            compositor.render_frame().unwrap();
        }
        assert_eq!(compositor.pixel(5, 5), Some(RED));
    }

    #[test]
    fn test_failed_screen_draw_still_draws_camera() {
        let compositor = Compositor::new(Resolution::new(30, 15)).unwrap();
        let (screen_pub, screen_feed) = video_channel();
        let (camera_pub, camera_feed) = video_channel();
        compositor.attach_screen(screen_feed);
        compositor.attach_camera(camera_feed);

        screen_pub.publish(VideoFrame::new(8, 4, vec![0u8; 5], Duration::ZERO));
        camera_pub.publish(VideoFrame::solid(Resolution::new(4, 3), GREEN, Duration::ZERO));

        assert!(compositor.render_frame().is_err());
        assert_eq!(compositor.pixel(25, 12), Some(GREEN));
        assert_eq!(compositor.stats().draw_failures, 1);
    }
}
