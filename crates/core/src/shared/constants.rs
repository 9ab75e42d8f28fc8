pub const MODEL_BASE_URL: &str =
    "https://cdn.jsdelivr.net/gh/justadudewhohacks/face-api.js/weights/";

pub const FACE_DETECTOR_MANIFEST: &str = "tiny_face_detector_model-weights_manifest.json";
pub const FACE_DETECTOR_WEIGHTS: &str = "tiny_face_detector_model-shard1";

pub const EXPRESSION_MANIFEST: &str = "face_expression_model-weights_manifest.json";
pub const EXPRESSION_WEIGHTS: &str = "face_expression_model-shard1";

/// Interval between detection ticks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Display surface the overlay is sized to unless configured otherwise.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 640;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 480;

/// Upper bounds on overlay stroke and label band, in display pixels.
pub const MAX_LINE_WIDTH: u32 = 64;
pub const MAX_LABEL_HEIGHT: u32 = 256;

pub const APP_DIR_NAME: &str = "FaceMood";
