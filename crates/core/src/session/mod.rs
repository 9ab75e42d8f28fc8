pub mod expression_cell;
pub mod session_controller;
pub mod session_event;
pub mod session_state;
