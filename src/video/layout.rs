/// Offset of the camera overlay as a fraction of the surface size
pub const CAMERA_OFFSET: f64 = 0.625;

/// Size of the camera overlay as a fraction of the surface size
pub const CAMERA_SCALE: f64 = 1.0 / 3.0;

/// Destination rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Integer pixel span `(x0, y0, x1, y1)` covered on a surface, clipped to it.
    ///
    /// A pixel belongs to the rect when its top-left corner lies inside.
    pub fn pixel_bounds(&self, surface_width: u32, surface_height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = |start: f64, len: f64, limit: u32| -> (u32, u32) {
            let lo = start.ceil().max(0.0).min(limit as f64) as u32;
            let hi = (start + len).ceil().max(0.0).min(limit as f64) as u32;
            (lo, hi)
        };

        let (x0, x1) = clip(self.x, self.width, surface_width);
        let (y0, y1) = clip(self.y, self.height, surface_height);

        if x0 >= x1 || y0 >= y1 {
            None
        } else {
            Some((x0, y0, x1, y1))
        }
    }
}

/// Picture-in-picture placement: screen fills the surface, camera sits bottom-right on top
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipLayout {
    pub screen: Rect,
    pub camera: Rect,
}

impl PipLayout {
    pub fn for_surface(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;

        Self {
            screen: Rect::new(0.0, 0.0, w, h),
            camera: Rect::new(CAMERA_OFFSET * w, CAMERA_OFFSET * h, w * CAMERA_SCALE, h * CAMERA_SCALE),
        }
    }
}
