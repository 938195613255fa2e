use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{CaptureError, CaptureResult};

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One decoded video frame (RGBA8, row-major).
///
/// Pixel data is shared, so cloning a frame is cheap.
#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Presentation time relative to the start of the producing track
    pub timestamp: Duration,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>, timestamp: Duration) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            timestamp,
        }
    }

    /// Frame filled with a single colour
    pub fn solid(resolution: Resolution, rgba: [u8; 4], timestamp: Duration) -> Self {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(resolution.byte_len())
            .collect();

        Self::new(resolution.width, resolution.height, data, timestamp)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Same pixels, new timestamp
    pub fn retimed(&self, timestamp: Duration) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// Check that the buffer matches the declared dimensions
    pub fn validate(&self) -> CaptureResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Draw(format!(
                "frame has empty dimensions {}",
                self.resolution()
            )));
        }
        let expected = self.resolution().byte_len();
        if self.data.len() != expected {
            return Err(CaptureError::Draw(format!(
                "frame {} carries {} bytes, expected {}",
                self.resolution(),
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Reader side of a video track: always holds the most recent frame
#[derive(Debug, Clone)]
pub struct VideoFeed {
    rx: watch::Receiver<Option<VideoFrame>>,
}

/// Writer side of a video track
#[derive(Debug)]
pub struct VideoPublisher {
    tx: watch::Sender<Option<VideoFrame>>,
}

/// Create a connected publisher / feed pair with no frame yet
pub fn video_channel() -> (VideoPublisher, VideoFeed) {
    let (tx, rx) = watch::channel(None);
    (VideoPublisher { tx }, VideoFeed { rx })
}

impl VideoPublisher {
    /// Replace the current frame; readers that lag simply see the newest one
    pub fn publish(&self, frame: VideoFrame) {
        self.tx.send_replace(Some(frame));
    }

    pub fn subscribe(&self) -> VideoFeed {
        VideoFeed {
            rx: self.tx.subscribe(),
        }
    }
}

impl VideoFeed {
    /// Most recent frame, if the producer has published one
    pub fn latest(&self) -> Option<VideoFrame> {
        self.rx.borrow().clone()
    }

    /// Wait for a frame newer than the last one seen by this reader.
    ///
    /// Returns `None` once the producer has gone away.
    pub async fn next_frame(&mut self) -> Option<VideoFrame> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}
