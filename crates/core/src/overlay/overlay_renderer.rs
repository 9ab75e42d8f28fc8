use crate::detection::domain::detection_result::DetectionResult;
use crate::overlay::overlay_style::OverlayStyle;
use crate::overlay::render_target::{Annotation, RenderTarget};
use crate::shared::bounding_box::PixelRect;

/// Draws one pass of detections onto a [`RenderTarget`].
///
/// Every pass starts from a blank surface sized to the display, so boxes
/// from earlier passes never linger.
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Renders `detections` found in a `frame_size` frame onto `target`,
    /// scaled to `display_size`. Returns the number of boxes drawn.
    pub fn render(
        &self,
        target: &mut RenderTarget,
        display_size: (u32, u32),
        frame_size: (u32, u32),
        detections: &[DetectionResult],
    ) -> usize {
        let (display_w, display_h) = display_size;
        if target.match_dimensions(display_w, display_h) {
            log::debug!("Overlay resized to {display_w}x{display_h}");
        }
        target.clear();

        let (frame_w, frame_h) = frame_size;
        if frame_w == 0 || frame_h == 0 {
            return 0;
        }
        let sx = display_w as f64 / frame_w as f64;
        let sy = display_h as f64 / frame_h as f64;

        let mut drawn = 0;
        for detection in detections {
            let scaled = detection.bounding_box.scale(sx, sy);
            let Some(rect) = scaled.to_pixel_rect(display_w, display_h) else {
                continue;
            };

            target.stroke_rect(rect, self.style.line_width, self.style.color);
            target.fill_rect(
                label_band(rect, self.style.label_height),
                self.style.label_background,
            );
            target.push_annotation(Annotation {
                rect,
                label: self.style.label.clone(),
                captions: captions(detection, self.style.min_caption_score),
            });
            drawn += 1;
        }
        drawn
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

/// Band for the box label: just above the box, or along its top edge when
/// there is no room above.
fn label_band(rect: PixelRect, label_height: u32) -> PixelRect {
    if rect.y0 >= label_height {
        PixelRect {
            y0: rect.y0 - label_height,
            y1: rect.y0,
            ..rect
        }
    } else {
        PixelRect {
            y1: rect.y0.saturating_add(label_height).min(rect.y1),
            ..rect
        }
    }
}

/// One line per expression above the threshold, most likely first, e.g.
/// `"happy (0.90)"`.
fn captions(detection: &DetectionResult, min_score: f64) -> Vec<String> {
    detection
        .expressions
        .ranked_above(min_score)
        .into_iter()
        .map(|(label, score)| format!("{label} ({score:.2})"))
        .collect()
}
