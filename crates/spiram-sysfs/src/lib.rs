//! spiram-sysfs - Serial RAM access through driver attribute files
//!
//! A kernel driver for these chips exposes one directory per device with
//! four attribute files: `addr` (hex), `size` (decimal), `listen` (`0`/`1`)
//! and `data` (raw bytes). This crate wraps such a directory as a
//! [`RamDevice`](spiram_core::device::RamDevice).
//!
//! # Example
//!
//! ```no_run
//! use spiram_sysfs::SysfsRam;
//!
//! let ram = SysfsRam::open("/sys/bus/spi/devices/spi0.0")?;
//! ram.write(0x23, b"testinggg")?;
//!
//! let mut buf = [0u8; 9];
//! ram.read(0x23, &mut buf)?;
//! assert_eq!(&buf, b"testinggg");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;

pub use device::{SysfsRam, ATTRIBUTES, MAX_CHUNK};
pub use error::{Result, SysfsError};
