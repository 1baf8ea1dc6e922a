//! Linux SPI transport implementation
//!
//! This module provides the `LinuxSpiTransport` struct that implements the
//! `HostTransport` trait using Linux's spidev interface for the data lines
//! and a GPIO character device line for chip select.

use crate::error::{LinuxSpiError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use spiram_core::chip::{DATA_WIDTH_BITS, DEFAULT_SPEED_HZ};
use spiram_core::error::{Error as CoreError, Result as CoreResult};
use spiram_core::transport::HostTransport;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default GPIO chip carrying the chip-select line
pub const DEFAULT_GPIOCHIP: &str = "/dev/gpiochip0";

/// Default chip-select line offset
pub const DEFAULT_CS_LINE: Offset = 14;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
    /// Controller does not drive its own chip select
    pub const NO_CS: u8 = 0x40;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(_IOC_WRITE, type, nr, size) with _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

impl SpiIocTransfer {
    fn tx(buf: &[u8], speed_hz: u32) -> Self {
        Self {
            tx_buf: buf.as_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: DATA_WIDTH_BITS,
            ..Default::default()
        }
    }

    fn rx(buf: &mut [u8], speed_hz: u32) -> Self {
        Self {
            rx_buf: buf.as_mut_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: DATA_WIDTH_BITS,
            ..Default::default()
        }
    }
}

/// Configuration for opening a Linux SPI transport
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 400 kHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
    /// Tell the controller not to drive its own chip select
    pub no_cs: bool,
    /// GPIO chip carrying the chip-select line
    pub gpiochip: String,
    /// Chip-select line offset
    pub cs: Offset,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            no_cs: false,
            gpiochip: DEFAULT_GPIOCHIP.to_string(),
            cs: DEFAULT_CS_LINE,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Set the chip-select GPIO chip and line
    pub fn with_chip_select(mut self, gpiochip: impl Into<String>, cs: Offset) -> Self {
        self.gpiochip = gpiochip.into();
        self.cs = cs;
        self
    }

    /// Stop the controller from driving its own chip select
    pub fn with_no_cs(mut self, no_cs: bool) -> Self {
        self.no_cs = no_cs;
        self
    }

    /// Mode byte passed to the kernel
    fn mode_bits(&self) -> u8 {
        if self.no_cs {
            self.mode | mode::NO_CS
        } else {
            self.mode
        }
    }
}

/// Chip-select line held through gpiocdev
///
/// The line is driven directly: high is released, low is asserted.
struct ChipSelectLine {
    request: Request,
    offset: Offset,
}

impl ChipSelectLine {
    fn request(chip: &str, offset: Offset) -> Result<Self> {
        let mut cfg = Config::default();
        // Starts released (high)
        cfg.with_line(offset).as_output(Value::Active);

        let request = Request::from_config(cfg)
            .on_chip(chip)
            .with_consumer("spiram")
            .request()
            .map_err(|source| LinuxSpiError::ChipSelectRequestFailed {
                chip: chip.to_string(),
                offset,
                source,
            })?;
        Ok(Self { request, offset })
    }

    fn drive(&mut self, asserted: bool) -> Result<()> {
        let value = if asserted {
            Value::Inactive
        } else {
            Value::Active
        };
        self.request
            .set_value(self.offset, value)
            .map(|_| ())
            .map_err(LinuxSpiError::ChipSelectFailed)
    }
}

/// Linux SPI host transport
///
/// Owns the spidev file and its chip-select line; two transports never
/// share a line.
pub struct LinuxSpiTransport {
    /// File handle for spidev device
    file: File,
    /// Chip-select line
    cs: ChipSelectLine,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Current speed in Hz
    speed_hz: u32,
}

impl LinuxSpiTransport {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = config.mode_bits();
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits: u8 = DATA_WIDTH_BITS;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let cs = ChipSelectLine::request(&config.gpiochip, config.cs)?;

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, cs={}:{})",
            config.device,
            config.mode,
            speed / 1000,
            config.gpiochip,
            config.cs
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            cs,
            max_kernel_buf_size,
            speed_hz: speed,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Set a new SPI clock speed
    pub fn set_speed(&mut self, speed_hz: u32) -> Result<()> {
        let fd = self.file.as_raw_fd();
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed_hz).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed: speed_hz,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }
        self.speed_hz = speed_hz;
        log::debug!("linux_spi: Set speed to {} Hz", speed_hz);
        Ok(())
    }

    fn message(&self, transfers: &[SpiIocTransfer]) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let ioctl_num = ioctl::spi_ioc_message(transfers.len() as u8);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, transfers.as_ptr()) };
        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    /// Send `write_data`, then receive into `read_buf`
    ///
    /// CS is held by the GPIO line, so oversized buffers are split into
    /// several messages without a gap the chip can see. The first message
    /// carries the write phase and the start of the read phase together.
    fn spi_transfer(&mut self, write_data: &[u8], read_buf: &mut [u8]) -> Result<()> {
        let max = self.max_kernel_buf_size.max(1);
        log::trace!(
            "linux_spi: tx {:02X?} rx {} bytes",
            &write_data[..write_data.len().min(16)],
            read_buf.len()
        );

        let mut tx_chunks = write_data.chunks(max).peekable();
        let mut rx_chunks = read_buf.chunks_mut(max);

        while let Some(tx) = tx_chunks.next() {
            let mut transfers = vec![SpiIocTransfer::tx(tx, self.speed_hz)];
            if tx_chunks.peek().is_none() {
                if let Some(rx) = rx_chunks.next() {
                    transfers.push(SpiIocTransfer::rx(rx, self.speed_hz));
                }
            }
            self.message(&transfers)?;
        }

        for rx in rx_chunks {
            self.message(&[SpiIocTransfer::rx(rx, self.speed_hz)])?;
        }

        Ok(())
    }
}

fn transport_error(e: LinuxSpiError) -> CoreError {
    log::error!("linux_spi: {}", e);
    match e {
        LinuxSpiError::ChipSelectFailed(_) => CoreError::ChipSelect,
        _ => CoreError::Transport,
    }
}

impl HostTransport for LinuxSpiTransport {
    fn assert_chip_select(&mut self) -> CoreResult<()> {
        self.cs.drive(true).map_err(transport_error)
    }

    fn deassert_chip_select(&mut self) -> CoreResult<()> {
        self.cs.drive(false).map_err(transport_error)
    }

    fn transfer(&mut self, out: &[u8]) -> CoreResult<()> {
        self.spi_transfer(out, &mut []).map_err(transport_error)
    }

    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> CoreResult<()> {
        self.spi_transfer(out, buf).map_err(transport_error)
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

fn invalid(key: &str, value: &str) -> LinuxSpiError {
    LinuxSpiError::InvalidParameter(format!("{}={}", key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "yes" | "true" => Ok(true),
        "0" | "no" | "false" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

/// Parse backend options from a list of key-value pairs
///
/// - `dev=/dev/spidevX.Y` - Required: device path
/// - `spispeed=N` - Optional: speed in kHz (default: 400)
/// - `mode=N` - Optional: SPI mode 0-3 (default: 0)
/// - `gpiochip=N` or `gpiochip=/dev/gpiochipN` - Optional: CS line chip
/// - `cs=N` - Optional: CS line offset (default: 14)
/// - `no_cs=1` - Optional: controller does not drive its own CS
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxSpiConfig> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                let speed_khz: u32 = value.parse().map_err(|_| invalid(key, value))?;
                if speed_khz == 0 {
                    return Err(LinuxSpiError::InvalidParameter(
                        "spispeed must be non-zero".to_string(),
                    ));
                }
                config.speed_hz = speed_khz
                    .checked_mul(1000)
                    .ok_or_else(|| invalid(key, value))?;
            }
            "mode" => {
                let mode: u8 = value.parse().map_err(|_| invalid(key, value))?;
                if mode > 3 {
                    return Err(LinuxSpiError::InvalidParameter(format!(
                        "SPI mode {} (must be 0-3)",
                        mode
                    )));
                }
                config.mode = mode;
            }
            "gpiochip" => {
                config.gpiochip = if value.starts_with('/') {
                    value.to_string()
                } else {
                    let n: u32 = value.parse().map_err(|_| invalid(key, value))?;
                    format!("/dev/gpiochip{}", n)
                };
            }
            "cs" => {
                config.cs = value.parse().map_err(|_| invalid(key, value))?;
            }
            "no_cs" => {
                config.no_cs = parse_flag(key, value)?;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err(LinuxSpiError::NoDevice);
    }

    Ok(config)
}
