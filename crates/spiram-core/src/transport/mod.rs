//! Host transport abstraction
//!
//! This module defines the bus primitives the protocol engine consumes.
//! Transports own the bus configuration (clock rate, word size) and the
//! chip-select line; the engine only sequences them.

mod traits;

pub use traits::*;
