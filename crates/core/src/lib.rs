//! Real-time facial expression detection loop.
//!
//! A [`session::session_controller::SessionController`] owns a camera-backed
//! [`capture::frame_source::FrameSource`] and, while running, a
//! [`scheduler::detection_scheduler::DetectionScheduler`] that polls frames,
//! hands them to an [`detection::domain::expression_detector::ExpressionDetector`]
//! and applies each completed pass to the overlay and the dominant
//! expression.

pub mod capture;
pub mod detection;
pub mod overlay;
pub mod scheduler;
pub mod session;
pub mod shared;
