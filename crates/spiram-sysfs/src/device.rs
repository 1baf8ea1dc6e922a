//! Attribute file device implementation
//!
//! This module provides the `SysfsRam` struct, which reaches a chip through
//! the `addr`, `size`, `listen` and `data` files a loaded driver exposes.

use crate::error::{Result, SysfsError};

use spiram_core::device::RamDevice;
use spiram_core::error::{Error as CoreError, Result as CoreResult};
use spiram_core::spi::AddressWidth;

use std::fs;
use std::path::{Path, PathBuf};

/// Attribute files every device directory must have
pub const ATTRIBUTES: [&str; 4] = [ADDR, SIZE, LISTEN, DATA];

const ADDR: &str = "addr";
const SIZE: &str = "size";
const LISTEN: &str = "listen";
const DATA: &str = "data";

/// Largest single access through the `data` file (one page)
pub const MAX_CHUNK: usize = 4096;

fn attribute_name(name: &str) -> Result<&'static str> {
    ATTRIBUTES
        .iter()
        .copied()
        .find(|a| *a == name)
        .ok_or_else(|| SysfsError::UnknownAttribute(name.to_string()))
}

/// A serial RAM chip behind driver attribute files
#[derive(Debug, Clone)]
pub struct SysfsRam {
    dir: PathBuf,
    capacity: Option<u32>,
}

impl SysfsRam {
    /// Open a device directory, checking that all attributes are present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        for name in ATTRIBUTES {
            if !dir.join(name).exists() {
                return Err(SysfsError::MissingAttribute { name, dir });
            }
        }
        log::info!("sysfs: Opened {}", dir.display());
        Ok(Self {
            dir,
            capacity: None,
        })
    }

    /// Set the chip capacity used for range checks
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Device directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn attr_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn store(&self, name: &str, value: &[u8]) -> Result<()> {
        let path = self.attr_path(name);
        log::trace!("sysfs: {} <- {} bytes", name, value.len());
        fs::write(&path, value).map_err(|source| SysfsError::Io { path, source })
    }

    fn show(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.attr_path(name);
        fs::read(&path).map_err(|source| SysfsError::Io { path, source })
    }

    fn show_text(&self, name: &'static str) -> Result<String> {
        let bytes = self.show(name)?;
        String::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|e| SysfsError::Parse {
                name,
                value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            })
    }

    /// Raw contents of a named attribute file
    pub fn show_attribute(&self, name: &str) -> Result<Vec<u8>> {
        let name = attribute_name(name)?;
        self.show(name)
    }

    /// Write raw bytes to a named attribute file
    pub fn store_attribute(&self, name: &str, value: &[u8]) -> Result<usize> {
        let name = attribute_name(name)?;
        self.store(name, value)?;
        Ok(value.len())
    }

    fn set_address(&self, addr: u32) -> Result<()> {
        self.store(ADDR, format!("0x{:x}", addr).as_bytes())
    }

    /// Write `buf` starting at `addr`
    ///
    /// Writes the address (in hex) and then the data file, one page at a
    /// time.
    pub fn write(&self, addr: u32, buf: &[u8]) -> Result<()> {
        let mut addr = addr;
        for chunk in buf.chunks(MAX_CHUNK) {
            self.set_address(addr)?;
            self.store(DATA, chunk)?;
            addr += chunk.len() as u32;
        }
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// Writes the size (in decimal) and the address (in hex), then reads the
    /// data file, one page at a time.
    pub fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let mut addr = addr;
        for chunk in buf.chunks_mut(MAX_CHUNK) {
            self.store(SIZE, chunk.len().to_string().as_bytes())?;
            self.set_address(addr)?;
            let data = self.show(DATA)?;
            if data.len() < chunk.len() {
                return Err(SysfsError::ShortRead {
                    expected: chunk.len(),
                    got: data.len(),
                });
            }
            chunk.copy_from_slice(&data[..chunk.len()]);
            addr += chunk.len() as u32;
        }
        Ok(())
    }

    /// Enter or leave listen mode
    pub fn listen(&self, enable: bool) -> Result<()> {
        self.store(LISTEN, if enable { b"1" } else { b"0" })
    }

    /// Current address pointer
    pub fn address(&self) -> Result<u32> {
        let text = self.show_text(ADDR)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        u32::from_str_radix(digits, 16).map_err(|_| SysfsError::Parse {
            name: ADDR,
            value: text.clone(),
        })
    }

    /// Current transfer size (0 while unset)
    pub fn size(&self) -> Result<u32> {
        let text = self.show_text(SIZE)?;
        text.parse().map_err(|_| SysfsError::Parse {
            name: SIZE,
            value: text.clone(),
        })
    }

    /// Whether the device is in listen mode
    pub fn is_listening(&self) -> Result<bool> {
        match self.show_text(LISTEN)?.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(SysfsError::Parse {
                name: LISTEN,
                value: other.to_string(),
            }),
        }
    }
}

fn core_error(e: SysfsError) -> CoreError {
    log::error!("sysfs: {}", e);
    match e {
        SysfsError::Parse { .. } => CoreError::Parse,
        SysfsError::UnknownAttribute(_) => CoreError::UnknownAttribute,
        _ => CoreError::Io,
    }
}

impl RamDevice for SysfsRam {
    fn capacity(&self) -> u32 {
        self.capacity
            .unwrap_or_else(|| AddressWidth::TwoByte.max_size())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> CoreResult<()> {
        if !self.is_valid_range(addr, buf.len()) {
            return Err(CoreError::AddressOutOfRange {
                addr,
                capacity: RamDevice::capacity(self),
            });
        }
        SysfsRam::read(self, addr, buf).map_err(core_error)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> CoreResult<()> {
        if !self.is_valid_range(addr, data.len()) {
            return Err(CoreError::AddressOutOfRange {
                addr,
                capacity: RamDevice::capacity(self),
            });
        }
        SysfsRam::write(self, addr, data).map_err(core_error)
    }

    fn seek(&mut self, addr: u32) -> CoreResult<()> {
        self.set_address(addr).map_err(core_error)
    }

    fn set_listen(&mut self, listen: bool) -> CoreResult<bool> {
        let current = SysfsRam::is_listening(self).map_err(core_error)?;
        if current == listen {
            return Ok(false);
        }
        self.listen(listen).map_err(core_error)?;
        Ok(true)
    }

    fn is_listening(&self) -> bool {
        SysfsRam::is_listening(self).unwrap_or_else(|e| {
            log::warn!("sysfs: {}", e);
            false
        })
    }
}
