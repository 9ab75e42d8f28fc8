pub mod detection_scheduler;
pub mod tick_logger;
