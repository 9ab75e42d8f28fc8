pub mod detection_result;
pub mod expression;
pub mod expression_aggregator;
pub mod expression_detector;
