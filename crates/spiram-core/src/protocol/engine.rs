//! Serial RAM protocol engine
//!
//! Turns memory and register operations into ordered chip-select
//! transitions and SPI transfers for a given [`ChipProfile`].
//!
//! Every transaction goes through [`with_chip_select`], which releases CS
//! on every exit path. The only exception is [`enter_listen`], which leaves
//! CS asserted on purpose; [`exit_listen`] releases it.
//!
//! Latched profiles (FRAM) bracket every memory write with WREN/WRDI, each
//! in its own CS frame. Once WREN has gone out, WRDI is always attempted,
//! even if the data transfer in between failed, so a failed write never
//! leaves the latch open.

use crate::chip::ChipProfile;
use crate::error::{Error, Result};
use crate::spi::{AddressWidth, SpiFrame};
use crate::transport::HostTransport;

/// Run `f` with CS asserted, releasing CS afterwards
///
/// If both `f` and the release fail, the error from `f` is returned.
pub fn with_chip_select<T, R, F>(transport: &mut T, f: F) -> Result<R>
where
    T: HostTransport + ?Sized,
    F: FnOnce(&mut T) -> Result<R>,
{
    if let Err(e) = transport.assert_chip_select() {
        // The line state is unknown, try to leave it released
        let _ = transport.deassert_chip_select();
        return Err(e);
    }

    let result = f(transport);
    let released = transport.deassert_chip_select();

    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(e), Err(release_err)) => {
            log::warn!("spiram: CS release failed after error: {}", release_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(e)) => Err(e),
    }
}

/// Send a single opcode in its own CS frame
pub fn send_command<T: HostTransport + ?Sized>(transport: &mut T, opcode: u8) -> Result<()> {
    let frame = SpiFrame::command(opcode);
    log::trace!("spiram: cmd {:02X}", opcode);
    with_chip_select(transport, |t| t.transfer(frame.as_bytes()))
}

/// Set the write enable latch (latched profiles only)
pub fn write_enable<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
) -> Result<()> {
    let opcode = profile
        .opcodes
        .write_enable
        .ok_or(Error::OpcodeNotSupported)?;
    send_command(transport, opcode)
}

/// Reset the write enable latch (latched profiles only)
pub fn write_disable<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
) -> Result<()> {
    let opcode = profile
        .opcodes
        .write_disable
        .ok_or(Error::OpcodeNotSupported)?;
    send_command(transport, opcode)
}

/// Read `buf.len()` bytes starting at `addr`
///
/// Returns the number of bytes read. On failure the buffer contents are
/// undefined.
pub fn read<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    addr: u32,
    buf: &mut [u8],
) -> Result<usize> {
    let frame = SpiFrame::addressed(profile.opcodes.read, addr, profile.address_width);
    log::debug!("spiram: read {} bytes at 0x{:04X}", buf.len(), addr);

    with_chip_select(transport, |t| t.transfer_then_receive(frame.as_bytes(), buf))?;
    Ok(buf.len())
}

/// Write `data` starting at `addr`
///
/// Latched profiles: WREN, WRITE+address+data, WRDI, each framed by CS.
/// Otherwise a single WRITE+address+data frame. Returns the number of
/// payload bytes written.
pub fn write<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    addr: u32,
    data: &[u8],
) -> Result<usize> {
    let frame = SpiFrame::addressed(profile.opcodes.write, addr, profile.address_width);
    let tx = frame.with_payload(data);
    log::debug!("spiram: write {} bytes at 0x{:04X}", data.len(), addr);

    if !profile.requires_write_latch() {
        with_chip_select(transport, |t| t.transfer(&tx))?;
        return Ok(data.len());
    }

    write_enable(transport, profile)?;

    let written = with_chip_select(transport, |t| t.transfer(&tx));
    let closed = write_disable(transport, profile);

    match (written, closed) {
        (Ok(()), Ok(())) => Ok(data.len()),
        (Err(e), Err(wrdi_err)) => {
            log::warn!("spiram: WRDI after failed write also failed: {}", wrdi_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), Err(e)) => {
            log::warn!("spiram: data written but write latch may still be set");
            Err(e)
        }
    }
}

/// Open the bus for streaming writes starting at `addr`
///
/// On success CS is left asserted with the WRITE frame already sent; raw
/// payload bytes can follow via [`stream`]. On failure CS is released and,
/// for latched profiles, the latch closed again.
pub fn enter_listen<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    addr: u32,
) -> Result<()> {
    let frame = SpiFrame::addressed(profile.opcodes.write, addr, profile.address_width);
    log::debug!("spiram: enter listen at 0x{:04X}", addr);

    if profile.requires_write_latch() {
        write_enable(transport, profile)?;
    }

    let opened = transport
        .assert_chip_select()
        .and_then(|()| transport.transfer(frame.as_bytes()));

    if let Err(e) = opened {
        let _ = transport.deassert_chip_select();
        if profile.requires_write_latch() {
            if let Err(wrdi_err) = write_disable(transport, profile) {
                log::warn!("spiram: WRDI after failed listen also failed: {}", wrdi_err);
            }
        }
        return Err(e);
    }

    Ok(())
}

/// Send raw payload bytes into an open listen frame
pub fn stream<T: HostTransport + ?Sized>(transport: &mut T, data: &[u8]) -> Result<()> {
    log::trace!("spiram: stream {} bytes", data.len());
    transport.transfer(data)
}

/// Close a listen frame opened by [`enter_listen`]
///
/// Releases CS, then on latched profiles sends WRDI in its own frame.
/// `on_release` runs as soon as CS is released, before WRDI, so callers
/// can record the released state even when WRDI fails.
pub fn exit_listen<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    on_release: impl FnOnce(),
) -> Result<()> {
    log::debug!("spiram: exit listen");
    transport.deassert_chip_select()?;
    on_release();

    if profile.requires_write_latch() {
        write_disable(transport, profile)?;
    }
    Ok(())
}

/// Read the status (FRAM) or mode (SRAM) register
pub fn read_register<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
) -> Result<u8> {
    let opcode = profile
        .opcodes
        .read_register
        .ok_or(Error::OpcodeNotSupported)?;
    let frame = SpiFrame::command(opcode);
    let mut buf = [0u8; 1];
    with_chip_select(transport, |t| t.transfer_then_receive(frame.as_bytes(), &mut buf))?;
    Ok(buf[0])
}

/// Write the status (FRAM) or mode (SRAM) register
///
/// Latched profiles send WREN first; the chip resets the latch itself
/// once the register write completes.
pub fn write_register<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    value: u8,
) -> Result<()> {
    let opcode = profile
        .opcodes
        .write_register
        .ok_or(Error::OpcodeNotSupported)?;

    if profile.requires_write_latch() {
        write_enable(transport, profile)?;
    }

    let frame = SpiFrame::command(opcode);
    let tx = frame.with_payload(&[value]);
    with_chip_select(transport, |t| t.transfer(&tx))
}

/// Read the device ID into `buf`
///
/// Returns the number of ID bytes, which is the profile's `id_len`.
pub fn read_device_id<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
    buf: &mut [u8],
) -> Result<usize> {
    let opcode = profile.opcodes.read_id.ok_or(Error::OpcodeNotSupported)?;
    let len = profile.id_len as usize;
    if buf.len() < len {
        return Err(Error::BufferTooSmall);
    }

    let frame = SpiFrame::addressed(opcode, 0, AddressWidth::None);
    with_chip_select(transport, |t| {
        t.transfer_then_receive(frame.as_bytes(), &mut buf[..len])
    })?;
    Ok(len)
}

/// Return a dual I/O part to plain SPI
pub fn reset_io<T: HostTransport + ?Sized>(
    transport: &mut T,
    profile: &ChipProfile,
) -> Result<()> {
    let opcode = profile.opcodes.reset_io.ok_or(Error::OpcodeNotSupported)?;
    send_command(transport, opcode)
}
