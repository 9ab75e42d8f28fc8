use serde::{Deserialize, Serialize};

/// Visual style of the per-face overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Text shown in the label band of every box.
    pub label: String,
    pub line_width: u32,
    /// RGBA stroke colour.
    pub color: [u8; 4],
    /// RGBA fill behind the label band.
    pub label_background: [u8; 4],
    pub label_height: u32,
    /// Expressions scoring at or below this are left out of the caption.
    pub min_caption_score: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            label: "Face".to_string(),
            line_width: 4,
            color: [0x4C, 0xAF, 0x50, 0xFF],
            label_background: [0, 0, 0, 77],
            label_height: 20,
            min_caption_score: 0.1,
        }
    }
}
