use crate::detection::domain::expression::ExpressionScores;
use crate::shared::bounding_box::BoundingBox;

/// One face found in a frame, with its expression distribution.
///
/// `bounding_box` is in the pixel space of the analyzed frame. Results are
/// produced fresh on every pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub bounding_box: BoundingBox,
    /// Face detector confidence, when the backend reports one.
    pub detection_score: Option<f64>,
    pub expressions: ExpressionScores,
}

impl DetectionResult {
    pub fn new(bounding_box: BoundingBox, expressions: ExpressionScores) -> Self {
        Self {
            bounding_box,
            detection_score: None,
            expressions,
        }
    }

    pub fn with_detection_score(mut self, score: f64) -> Self {
        self.detection_score = Some(score);
        self
    }

    /// Drops detections the face detector scored below `min_score`.
    ///
    /// Detections without a score are kept. Order is preserved, so the face
    /// of interest stays first among the survivors.
    pub fn filter_by_score(results: Vec<DetectionResult>, min_score: f64) -> Vec<DetectionResult> {
        if min_score <= 0.0 {
            return results;
        }
        results
            .into_iter()
            .filter(|r| r.detection_score.map_or(true, |s| s >= min_score))
            .collect()
    }
}
