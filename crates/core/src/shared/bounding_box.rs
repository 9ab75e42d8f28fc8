/// Axis-aligned face box in the pixel space of the frame it was found in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer rectangle clamped to a surface: `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Maps the box from one surface size to another.
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Rounds and clamps the box to a `surface_w × surface_h` surface.
    ///
    /// Returns `None` when nothing of the box is visible.
    pub fn to_pixel_rect(&self, surface_w: u32, surface_h: u32) -> Option<PixelRect> {
        if !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
        {
            return None;
        }
        let clamp_x = |v: f64| v.round().clamp(0.0, surface_w as f64) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, surface_h as f64) as u32;

        let x0 = clamp_x(self.x);
        let y0 = clamp_y(self.y);
        let x1 = clamp_x(self.x + self.width);
        let y1 = clamp_y(self.y + self.height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect { x0, y0, x1, y1 })
    }
}
