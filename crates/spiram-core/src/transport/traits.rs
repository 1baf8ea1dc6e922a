//! Host transport trait definitions

use crate::error::Result;

/// SPI bus primitives for one attached chip
///
/// Each implementation drives exactly one chip-select line. The line is
/// part of the transport instance, so two sessions never share one.
///
/// ## Contract
///
/// - `assert_chip_select` / `deassert_chip_select` drive the CS line
///   active/inactive. They may be called while already in that state.
/// - `transfer` clocks out `out` and discards whatever comes back.
/// - `transfer_then_receive` clocks out `out`, then clocks in exactly
///   `buf.len()` bytes, without releasing CS in between.
///
/// ## Example
///
/// ```ignore
/// impl HostTransport for MyBus {
///     fn assert_chip_select(&mut self) -> Result<()> {
///         self.cs.set_low().map_err(|_| Error::ChipSelect)
///     }
///
///     fn deassert_chip_select(&mut self) -> Result<()> {
///         self.cs.set_high().map_err(|_| Error::ChipSelect)
///     }
///
///     fn transfer(&mut self, out: &[u8]) -> Result<()> {
///         self.spi.write(out).map_err(|_| Error::Transport)
///     }
///
///     fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()> {
///         self.spi.write(out).map_err(|_| Error::Transport)?;
///         self.spi.read(buf).map_err(|_| Error::Transport)
///     }
/// }
/// ```
pub trait HostTransport {
    /// Drive the chip-select line active
    fn assert_chip_select(&mut self) -> Result<()>;

    /// Drive the chip-select line inactive
    fn deassert_chip_select(&mut self) -> Result<()>;

    /// Send bytes on the bus
    fn transfer(&mut self, out: &[u8]) -> Result<()>;

    /// Send bytes, then receive `buf.len()` bytes
    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()>;
}

impl<T: HostTransport + ?Sized> HostTransport for &mut T {
    fn assert_chip_select(&mut self) -> Result<()> {
        (**self).assert_chip_select()
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        (**self).deassert_chip_select()
    }

    fn transfer(&mut self, out: &[u8]) -> Result<()> {
        (**self).transfer(out)
    }

    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()> {
        (**self).transfer_then_receive(out, buf)
    }
}

// Blanket impl for boxed transports to allow trait objects
impl HostTransport for alloc::boxed::Box<dyn HostTransport + Send> {
    fn assert_chip_select(&mut self) -> Result<()> {
        (**self).assert_chip_select()
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        (**self).deassert_chip_select()
    }

    fn transfer(&mut self, out: &[u8]) -> Result<()> {
        (**self).transfer(out)
    }

    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()> {
        (**self).transfer_then_receive(out, buf)
    }
}
