use std::path::Path;

use image::RgbaImage;
use ndarray::{s, ArrayViewMut3, Axis};

use crate::shared::bounding_box::PixelRect;

/// One face drawn in the current pass.
///
/// Text is not rasterized here: the UI paints `label` and `captions` at
/// `rect`, using its own fonts.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub rect: PixelRect,
    pub label: String,
    pub captions: Vec<String>,
}

/// Transparent RGBA overlay surface laid over the video.
pub struct RenderTarget {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    annotations: Vec<Annotation>,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            annotations: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes the surface to `width × height`, discarding its contents.
    ///
    /// Returns `false` when the size already matched.
    pub fn match_dimensions(&mut self, width: u32, height: u32) -> bool {
        if (width, height) == self.size() {
            return false;
        }
        *self = Self::new(width, height);
        true
    }

    /// Makes every pixel transparent and forgets all annotations.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.annotations.clear();
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn push_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// True when nothing has been drawn since the last clear.
    pub fn is_blank(&self) -> bool {
        self.annotations.is_empty() && self.pixels.iter().all(|&b| b == 0)
    }

    /// Source-over blends `rgba` into `rect`.
    pub fn fill_rect(&mut self, rect: PixelRect, rgba: [u8; 4]) {
        let x1 = rect.x1.min(self.width) as usize;
        let y1 = rect.y1.min(self.height) as usize;
        let x0 = (rect.x0 as usize).min(x1);
        let y0 = (rect.y0 as usize).min(y1);
        if x0 == x1 || y0 == y1 || rgba[3] == 0 {
            return;
        }

        let alpha = rgba[3] as f32 / 255.0;
        let mut view = self.view_mut();
        let mut roi = view.slice_mut(s![y0..y1, x0..x1, ..]);
        for mut px in roi.lanes_mut(Axis(2)) {
            for c in 0..3 {
                let dst = px[c] as f32;
                px[c] = (rgba[c] as f32 * alpha + dst * (1.0 - alpha)).round() as u8;
            }
            let dst_a = px[3] as f32 / 255.0;
            px[3] = ((alpha + dst_a * (1.0 - alpha)) * 255.0).round() as u8;
        }
    }

    /// Draws the outline of `rect`, `line_width` pixels thick, inside it.
    pub fn stroke_rect(&mut self, rect: PixelRect, line_width: u32, rgba: [u8; 4]) {
        let lw = line_width.max(1);
        let both_sides = lw.saturating_mul(2);
        if rect.width() <= both_sides || rect.height() <= both_sides {
            self.fill_rect(rect, rgba);
            return;
        }
        let PixelRect { x0, y0, x1, y1 } = rect;
        // Side bands stop short of the top/bottom bands so translucent
        // corners are blended once.
        self.fill_rect(PixelRect { x0, y0, x1, y1: y0 + lw }, rgba);
        self.fill_rect(PixelRect { x0, y0: y1 - lw, x1, y1 }, rgba);
        self.fill_rect(
            PixelRect {
                x0,
                y0: y0 + lw,
                x1: x0 + lw,
                y1: y1 - lw,
            },
            rgba,
        );
        self.fill_rect(
            PixelRect {
                x0: x1 - lw,
                y0: y0 + lw,
                x1,
                y1: y1 - lw,
            },
            rgba,
        );
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .expect("pixel buffer length matches dimensions")
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.to_rgba_image().save(path)
    }

    fn view_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(
            (self.height as usize, self.width as usize, 4),
            &mut self.pixels,
        )
        .expect("pixel buffer length matches dimensions")
    }
}
