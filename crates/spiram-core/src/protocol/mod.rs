//! Chip-select framing and command sequencing
//!
//! The functions here are stateless; [`crate::session::DeviceSession`]
//! tracks the address pointer, transfer size and listen state on top.

mod engine;

pub use engine::*;
