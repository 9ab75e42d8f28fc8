pub mod domain;
pub mod frame_source;
