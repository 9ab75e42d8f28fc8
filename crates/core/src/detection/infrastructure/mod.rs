pub mod model_resolver;
pub mod preloaded_detector;
