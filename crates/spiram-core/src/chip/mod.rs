//! RAM chip profiles and database
//!
//! This module provides types for describing serial RAM chips and their
//! opcode sets, the built-in profiles, and (with `std`) a database of
//! profiles loadable from RON files.

mod features;
mod types;

#[cfg(feature = "std")]
mod database;

pub use features::Features;
pub use types::*;

#[cfg(feature = "std")]
pub use database::*;
