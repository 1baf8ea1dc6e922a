//! SPI types and frame structures
//!
//! This module provides the opcode constants for the supported RAM parts,
//! the address width type and the per-transaction command frame.

mod address;
mod frame;
pub mod opcodes;

pub use address::AddressWidth;
pub use frame::SpiFrame;
pub use opcodes::*;
