use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::expression::Expression;

/// What to do with the dominant expression when a pass finds no faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyDetectionPolicy {
    /// Keep showing the last expression.
    #[default]
    Hold,
    /// Clear it until a face is seen again.
    Reset,
}

/// The expression presented to the user as "current".
#[derive(Debug, Clone, PartialEq)]
pub struct DominantExpression {
    pub label: String,
    /// `None` when the classifier used a label outside the vocabulary.
    pub expression: Option<Expression>,
    pub glyph: &'static str,
    pub score: f64,
}

impl DominantExpression {
    pub fn new(label: &str, score: f64) -> Self {
        let expression = Expression::from_label(label);
        Self {
            label: label.to_string(),
            expression,
            glyph: expression.unwrap_or(Expression::Neutral).glyph(),
            score,
        }
    }
}

/// Reduces a pass's detections to a single dominant expression.
///
/// The face of interest is the first detection as ordered by the backend,
/// not the largest or most confident one.
pub struct ExpressionAggregator {
    policy: EmptyDetectionPolicy,
    current: Option<DominantExpression>,
}

impl ExpressionAggregator {
    pub fn new(policy: EmptyDetectionPolicy) -> Self {
        Self {
            policy,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&DominantExpression> {
        self.current.as_ref()
    }

    /// Folds one pass into the current value. Returns `true` when the
    /// displayed label changed (including being set or cleared).
    pub fn update(&mut self, detections: &[DetectionResult]) -> bool {
        let previous_label = self.current.as_ref().map(|d| d.label.clone());

        match detections.first() {
            None => {
                if self.policy == EmptyDetectionPolicy::Reset {
                    self.current = None;
                }
            }
            Some(face) => {
                if let Some((label, score)) = face.expressions.dominant() {
                    self.current = Some(DominantExpression::new(label, score));
                }
            }
        }

        previous_label.as_deref() != self.current.as_ref().map(|d| d.label.as_str())
    }
}

impl Default for ExpressionAggregator {
    fn default() -> Self {
        Self::new(EmptyDetectionPolicy::default())
    }
}
