//! spiram-core - Protocol engine for SPI serial RAM chips
//!
//! This crate drives SPI-attached FRAM and SRAM parts through a single
//! engine parameterized by a [`chip::ChipProfile`]. It is `no_std`
//! compatible (it needs `alloc` for the combined write buffer).
//!
//! # Features
//!
//! - `std` - Enable the RON chip database, the attribute control surface
//!   and `std::error::Error` for the error type
//!
//! # Example
//!
//! ```ignore
//! use spiram_core::chip::MB85RS64V;
//! use spiram_core::session::DeviceSession;
//!
//! let mut session = DeviceSession::attach(MB85RS64V, transport);
//! session.set_address(0x23)?;
//! session.write(b"testinggg")?;
//!
//! session.set_size(9)?;
//! let mut buf = [0u8; 9];
//! session.read(&mut buf)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
#[cfg(feature = "std")]
pub mod control;
pub mod device;
pub mod error;
pub mod protocol;
pub mod session;
pub mod spi;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};
