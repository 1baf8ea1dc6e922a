//! spiram-linux-spi - Linux spidev host transport
//!
//! This crate drives a serial RAM chip through a Linux `/dev/spidevX.Y`
//! character device, with chip select on a separate GPIO line requested
//! through the GPIO character device.
//!
//! # Overview
//!
//! The protocol engine needs CS held across several transfers (and, in
//! listen mode, across calls). A kernel-driven CS drops between ioctls, so
//! CS is a GPIO output owned by the transport instead. Pass `no_cs=1` if
//! the controller would otherwise toggle its own CS pin on the same wire.
//!
//! # Example
//!
//! ```no_run
//! use spiram_core::chip::MB85RS64V;
//! use spiram_core::session::DeviceSession;
//! use spiram_linux_spi::{LinuxSpiConfig, LinuxSpiTransport};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0")
//!     .with_speed(400_000)
//!     .with_chip_select("/dev/gpiochip0", 14);
//! let spi = LinuxSpiTransport::open(&config)?;
//!
//! let mut session = DeviceSession::attach(MB85RS64V, spi);
//! session.set_address(0x23)?;
//! session.write(b"testinggg")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the spiram CLI
//!
//! ```bash
//! # Read 16 bytes at 0x23 using the default CS line (gpiochip0, line 14)
//! spiram read -p linux_spi:chip=MB85RS64V,dev=/dev/spidev0.0 --addr 0x23 --length 16
//!
//! # Specify SPI speed in kHz and a different CS line
//! spiram dump -p linux_spi:chip=23LCV512,dev=/dev/spidev0.1,spispeed=4000,gpiochip=1,cs=25 -o sram.bin
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` and `/dev/gpiochipN`

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, parse_options, LinuxSpiConfig, LinuxSpiTransport};
pub use error::{LinuxSpiError, Result};

/// Open a Linux SPI transport from backend options
///
/// This is a convenience function for use in the backend registry.
///
/// # Example Options
///
/// - `dev=/dev/spidev0.0` - Required: device path
/// - `spispeed=400` - Optional: speed in kHz (default: 400)
/// - `mode=0` - Optional: SPI mode 0-3 (default: 0)
/// - `gpiochip=0` - Optional: GPIO chip of the CS line (default: 0)
/// - `cs=14` - Optional: CS line offset (default: 14)
/// - `no_cs=1` - Optional: controller does not drive its own CS
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<LinuxSpiTransport, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let spi = LinuxSpiTransport::open(&config)?;
    Ok(spi)
}
