use thiserror::Error;

use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("expression models are not loaded")]
    ModelNotLoaded,

    #[error("inference failed: {0}")]
    Failed(String),
}

/// Domain interface for face detection plus expression classification.
///
/// Calls may take longer than the scheduler's tick interval; the scheduler
/// never issues a second call while one is outstanding. Returned detections
/// are ordered as the backend produced them.
pub trait ExpressionDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, InferenceError>;
}
