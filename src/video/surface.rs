use std::time::Duration;

use super::frame::{Resolution, VideoFrame, BYTES_PER_PIXEL};
use super::layout::Rect;
use crate::error::{CaptureError, CaptureResult};

/// Fixed-size RGBA drawing surface, overwritten in place every render tick
pub struct Surface {
    resolution: Resolution,
    pixels: Vec<u8>,
}

impl Surface {
    /// Create a black, opaque surface
    pub fn new(resolution: Resolution) -> CaptureResult<Self> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(CaptureError::InvalidState(format!(
                "surface size {} must be non-zero",
                resolution
            )));
        }

        let pixels = [0u8, 0, 0, 255]
            .iter()
            .copied()
            .cycle()
            .take(resolution.byte_len())
            .collect();

        Ok(Self { resolution, pixels })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Stretch `frame` into `dest` (nearest neighbour, aspect ratio not kept)
    pub fn draw_frame(&mut self, frame: &VideoFrame, dest: Rect) -> CaptureResult<()> {
        frame.validate()?;

        let Some((x0, y0, x1, y1)) = dest.pixel_bounds(self.resolution.width, self.resolution.height)
        else {
            return Ok(());
        };

        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let dst_w = self.resolution.width as usize;

        for dy in y0..y1 {
            let sy = (((dy as f64 - dest.y) / dest.height) * src_h as f64) as usize;
            let sy = sy.min(src_h - 1);
            let src_row = sy * src_w;
            let dst_row = dy as usize * dst_w;

            for dx in x0..x1 {
                let sx = (((dx as f64 - dest.x) / dest.width) * src_w as f64) as usize;
                let sx = sx.min(src_w - 1);

                let s = (src_row + sx) * BYTES_PER_PIXEL;
                let d = (dst_row + dx as usize) * BYTES_PER_PIXEL;
                self.pixels[d..d + BYTES_PER_PIXEL].copy_from_slice(&frame.data[s..s + BYTES_PER_PIXEL]);
            }
        }

        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        let offset = (y as usize * self.resolution.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.pixels[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy the current contents out as a frame
    pub fn snapshot(&self, timestamp: Duration) -> VideoFrame {
        VideoFrame::new(
            self.resolution.width,
            self.resolution.height,
            self.pixels.clone(),
            timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PipLayout;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    #[test]
    fn test_zero_sized_surface_is_rejected() {
        assert!(Surface::new(Resolution::new(0, 10)).is_err());
    }

    #[test]
    fn test_screen_then_camera_layering() {
        let mut surface = Surface::new(Resolution::new(300, 150)).unwrap();
        let layout = PipLayout::for_surface(300, 150);

        // Wide screen frame and a tall camera frame: both are stretched
        let screen = VideoFrame::solid(Resolution::new(64, 36), RED, Duration::ZERO);
        let camera = VideoFrame::solid(Resolution::new(9, 16), BLUE, Duration::ZERO);

        surface.draw_frame(&screen, layout.screen).unwrap();
        surface.draw_frame(&camera, layout.camera).unwrap();

        assert_eq!(surface.pixel(0, 0), Some(RED));
        assert_eq!(surface.pixel(187, 93), Some(RED));
        assert_eq!(surface.pixel(188, 94), Some(BLUE));
        assert_eq!(surface.pixel(287, 143), Some(BLUE));
        assert_eq!(surface.pixel(288, 144), Some(RED));
        assert_eq!(surface.pixel(299, 149), Some(RED));
    }

    #[test]
    fn test_malformed_frame_leaves_surface_untouched() {
        let mut surface = Surface::new(Resolution::new(8, 8)).unwrap();
        let bad = VideoFrame::new(8, 8, vec![255u8; 3], Duration::ZERO);

        assert!(surface.draw_frame(&bad, Rect::new(0.0, 0.0, 8.0, 8.0)).is_err());
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_snapshot_copies_pixels() {
        let mut surface = Surface::new(Resolution::new(2, 2)).unwrap();
        let frame = VideoFrame::solid(Resolution::new(1, 1), RED, Duration::ZERO);
        surface.draw_frame(&frame, Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();

        let snapshot = surface.snapshot(Duration::from_millis(33));
        assert_eq!(snapshot.resolution(), Resolution::new(2, 2));
        assert_eq!(snapshot.timestamp, Duration::from_millis(33));
        assert_eq!(snapshot.pixel(1, 1), Some(RED));
    }
}
