//! Unified RAM device trait
//!
//! This module provides the `RamDevice` trait that abstracts over a chip
//! driven directly through a [`DeviceSession`] and one reached through
//! another interface (e.g., the attribute files of a kernel driver).

use crate::chip::Features;
use crate::error::{Error, Result};
use crate::session::DeviceSession;
use crate::transport::HostTransport;

/// Unified trait for serial RAM devices
///
/// All operations take explicit addresses; implementations move their own
/// address pointer as needed.
///
/// # Example
///
/// ```ignore
/// use spiram_core::device::RamDevice;
///
/// fn read_header<D: RamDevice>(device: &mut D) -> Result<[u8; 16]> {
///     let mut buf = [0u8; 16];
///     device.read(0, &mut buf)?;
///     Ok(buf)
/// }
/// ```
pub trait RamDevice {
    /// Capacity in bytes
    fn capacity(&self) -> u32;

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// # Errors
    /// * `AddressOutOfRange` - If the read extends beyond the capacity
    /// * `InvalidState` - If the device is listening
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `addr`
    ///
    /// # Errors
    /// * `AddressOutOfRange` - If the write extends beyond the capacity
    /// * `InvalidState` - If the device is listening
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Move the address pointer used by listen mode
    fn seek(&mut self, addr: u32) -> Result<()>;

    /// Enter or leave listen mode, returning whether the state changed
    fn set_listen(&mut self, listen: bool) -> Result<bool>;

    /// Whether the device is in listen mode
    fn is_listening(&self) -> bool;

    /// Stream payload bytes while listening
    fn stream(&mut self, _data: &[u8]) -> Result<()> {
        Err(Error::OpcodeNotSupported)
    }

    /// Read the status (FRAM) or mode (SRAM) register
    fn read_register(&mut self) -> Result<u8> {
        Err(Error::OpcodeNotSupported)
    }

    /// Read the device ID
    fn read_device_id(&mut self) -> Result<[u8; 4]> {
        Err(Error::OpcodeNotSupported)
    }

    /// Check if a range is valid for this device
    fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        let end = addr as u64 + len as u64;
        end <= self.capacity() as u64
    }
}

/// Extension trait for RamDevice with whole-chip helpers
pub trait RamDeviceExt: RamDevice {
    /// Read the entire chip
    fn read_all(&mut self) -> Result<alloc::vec::Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.capacity() as usize];
        self.read(0, &mut buf)?;
        Ok(buf)
    }
}

impl<D: RamDevice + ?Sized> RamDeviceExt for D {}

fn check_range<D: RamDevice + ?Sized>(device: &D, addr: u32, len: usize) -> Result<()> {
    if device.is_valid_range(addr, len) {
        Ok(())
    } else {
        Err(Error::AddressOutOfRange {
            addr: addr.saturating_add(len as u32),
            capacity: device.capacity(),
        })
    }
}

impl<T: HostTransport> RamDevice for DeviceSession<T> {
    fn capacity(&self) -> u32 {
        self.profile().capacity
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self, addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.set_address(addr)?;
        self.set_size(buf.len() as u32)?;
        DeviceSession::read(self, buf)?;
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        check_range(self, addr, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        self.set_address(addr)?;
        DeviceSession::write(self, data)?;
        Ok(())
    }

    fn seek(&mut self, addr: u32) -> Result<()> {
        self.set_address(addr)
    }

    fn set_listen(&mut self, listen: bool) -> Result<bool> {
        self.set_listening(listen)
    }

    fn is_listening(&self) -> bool {
        DeviceSession::is_listening(self)
    }

    fn stream(&mut self, data: &[u8]) -> Result<()> {
        DeviceSession::stream(self, data)?;
        Ok(())
    }

    fn read_register(&mut self) -> Result<u8> {
        if self.profile().opcodes.read_register.is_none() {
            return Err(Error::OpcodeNotSupported);
        }
        if self.profile().features.contains(Features::STATUS_REG) {
            self.read_status()
        } else {
            self.read_mode()
        }
    }

    fn read_device_id(&mut self) -> Result<[u8; 4]> {
        DeviceSession::read_device_id(self)
    }
}
