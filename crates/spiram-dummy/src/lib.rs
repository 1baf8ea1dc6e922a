//! spiram-dummy - In-memory serial RAM emulator for testing
//!
//! This crate provides a host transport that emulates an FRAM or SRAM chip
//! in memory, byte by byte, the way the chip sees the bus. It's useful for
//! testing and development without real hardware.
//!
//! Besides the memory array the emulator models the write enable latch,
//! the FRAM status register, the SRAM mode register (byte, page and
//! sequential access) and the device ID. Every bus call is logged, and a
//! transfer or chip-select operation can be made to fail on demand.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use spiram_core::chip::{ChipProfile, StaticChip, MB85RS64V};
use spiram_core::error::{Error, Result};
use spiram_core::spi::opcodes;
use spiram_core::transport::HostTransport;

/// SRAM page size in page mode
pub const SRAM_PAGE_SIZE: u32 = 32;

/// Status register bits that WRSR can change
const SR_WRITABLE: u8 = opcodes::SR_BP0 | opcodes::SR_BP1 | opcodes::SR_WPEN;

/// Configuration for the dummy chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Protocol profile to emulate
    pub profile: ChipProfile,
    /// RDID response
    pub device_id: [u8; 4],
    /// Initial memory contents
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            profile: MB85RS64V,
            device_id: [0x04, 0x7F, 0x03, 0x02],
            fill: 0x00,
        }
    }
}

impl DummyConfig {
    /// Configuration for a built-in chip
    pub fn for_chip(chip: &StaticChip) -> Self {
        Self {
            profile: chip.profile,
            device_id: chip.device_id.unwrap_or_default(),
            fill: 0x00,
        }
    }
}

/// One call on the emulated bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// CS driven active
    Assert,
    /// CS driven inactive
    Deassert,
    /// Bytes sent
    Transfer(Vec<u8>),
    /// Bytes sent, then `n` bytes received
    TransferThenReceive(Vec<u8>, usize),
}

/// Where the chip is within the current CS frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the opcode byte
    Opcode,
    /// Collecting address bytes
    Address { opcode: u8, remaining: usize, addr: u32 },
    /// Memory access at `addr`
    Data { opcode: u8, addr: u32, count: u32 },
    /// Register read
    RegisterRead,
    /// Register write, waiting for the value byte
    RegisterWrite,
    /// Device ID output
    DeviceId { index: usize },
    /// Frame carries nothing more the chip cares about
    Ignore,
}

/// Dummy serial RAM chip
///
/// Emulates a chip in memory for testing purposes.
pub struct DummyRam {
    config: DummyConfig,
    memory: Vec<u8>,
    write_enabled: bool,
    status: u8,
    mode: u8,
    dual_io: bool,
    cs_active: bool,
    phase: Phase,
    frame_opcode: Option<u8>,
    events: Vec<BusEvent>,
    transfers: usize,
    cs_ops: usize,
    fail_transfer_at: Option<usize>,
    fail_chip_select_at: Option<usize>,
}

impl DummyRam {
    /// Create a new dummy chip with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let memory = vec![config.fill; config.profile.capacity as usize];
        Self {
            config,
            memory,
            write_enabled: false,
            status: 0,
            mode: opcodes::MR_SEQUENTIAL,
            dual_io: false,
            cs_active: false,
            phase: Phase::Ignore,
            frame_opcode: None,
            events: Vec::new(),
            transfers: 0,
            cs_ops: 0,
            fail_transfer_at: None,
            fail_chip_select_at: None,
        }
    }

    /// Create a new dummy chip with default configuration (MB85RS64V)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy chip for a built-in profile
    pub fn for_chip(chip: &StaticChip) -> Self {
        Self::new(DummyConfig::for_chip(chip))
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get a reference to the memory array
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Get a mutable reference to the memory array
    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Whether the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Whether CS is currently asserted
    pub fn cs_active(&self) -> bool {
        self.cs_active
    }

    /// Whether the chip is in dual I/O mode
    pub fn dual_io(&self) -> bool {
        self.dual_io
    }

    /// Status register as RDSR reports it
    pub fn status(&self) -> u8 {
        let wel = if self.write_enabled { opcodes::SR_WEL } else { 0 };
        self.status | wel
    }

    /// Mode register
    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Every bus call so far
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded bus calls
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Bytes sent in each completed CS frame, in order
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in &self.events {
            match event {
                BusEvent::Assert => current = Some(Vec::new()),
                BusEvent::Deassert => out.extend(current.take()),
                BusEvent::Transfer(bytes) | BusEvent::TransferThenReceive(bytes, _) => {
                    if let Some(tx) = current.as_mut() {
                        tx.extend_from_slice(bytes);
                    }
                }
            }
        }
        out
    }

    /// Fail the `index`-th transfer from now (zero-based)
    pub fn fail_transfer_at(&mut self, index: usize) {
        self.fail_transfer_at = Some(self.transfers + index);
    }

    /// Fail the `index`-th chip-select operation from now (zero-based)
    pub fn fail_chip_select_at(&mut self, index: usize) {
        self.fail_chip_select_at = Some(self.cs_ops + index);
    }

    fn is_latched(&self) -> bool {
        self.config.profile.requires_write_latch()
    }

    fn capacity(&self) -> u32 {
        self.config.profile.capacity
    }

    fn next_cs_op(&mut self) -> Result<()> {
        let index = self.cs_ops;
        self.cs_ops += 1;
        if self.fail_chip_select_at == Some(index) {
            log::debug!("dummy: injected chip-select failure");
            return Err(Error::ChipSelect);
        }
        Ok(())
    }

    fn next_transfer(&mut self) -> Result<()> {
        if !self.cs_active {
            log::warn!("dummy: transfer with CS released");
            return Err(Error::Transport);
        }
        let index = self.transfers;
        self.transfers += 1;
        if self.fail_transfer_at == Some(index) {
            log::debug!("dummy: injected transfer failure");
            return Err(Error::Transport);
        }
        Ok(())
    }

    /// Address following `addr` for the current access mode
    fn advance(&self, addr: u32) -> u32 {
        if !self.is_latched() && self.mode & opcodes::MR_MODE_MASK == opcodes::MR_PAGE {
            let page = addr & !(SRAM_PAGE_SIZE - 1);
            page | ((addr + 1) & (SRAM_PAGE_SIZE - 1))
        } else {
            (addr + 1) % self.capacity()
        }
    }

    /// Whether another byte may be accessed in this frame
    fn can_access(&self, count: u32) -> bool {
        self.is_latched() || self.mode & opcodes::MR_MODE_MASK != opcodes::MR_BYTE || count == 0
    }

    fn start_opcode(&mut self, opcode: u8) -> Phase {
        let ops = self.config.profile.opcodes;
        let width = self.config.profile.address_width.bytes();
        self.frame_opcode = Some(opcode);

        if opcode == ops.read || opcode == ops.write {
            return if width == 0 {
                Phase::Data {
                    opcode,
                    addr: 0,
                    count: 0,
                }
            } else {
                Phase::Address {
                    opcode,
                    remaining: width,
                    addr: 0,
                }
            };
        }
        if Some(opcode) == ops.write_enable {
            self.write_enabled = true;
            return Phase::Ignore;
        }
        if Some(opcode) == ops.write_disable {
            self.write_enabled = false;
            return Phase::Ignore;
        }
        if Some(opcode) == ops.read_register {
            return Phase::RegisterRead;
        }
        if Some(opcode) == ops.write_register {
            return Phase::RegisterWrite;
        }
        if Some(opcode) == ops.read_id {
            return Phase::DeviceId { index: 0 };
        }
        if Some(opcode) == ops.enter_dual_io {
            self.dual_io = true;
            return Phase::Ignore;
        }
        if Some(opcode) == ops.reset_io {
            self.dual_io = false;
            return Phase::Ignore;
        }

        log::warn!("dummy: unknown opcode 0x{:02X}", opcode);
        Phase::Ignore
    }

    /// Clock one byte in from the host
    fn shift_in(&mut self, byte: u8) {
        let phase = self.phase;
        self.phase = match phase {
            Phase::Opcode => self.start_opcode(byte),
            Phase::Address {
                opcode,
                remaining,
                addr,
            } => {
                let addr = (addr << 8) | byte as u32;
                if remaining > 1 {
                    Phase::Address {
                        opcode,
                        remaining: remaining - 1,
                        addr,
                    }
                } else {
                    Phase::Data {
                        opcode,
                        addr: addr % self.capacity(),
                        count: 0,
                    }
                }
            }
            Phase::Data {
                opcode,
                addr,
                count,
            } if opcode == self.config.profile.opcodes.write => {
                let writable = !self.is_latched() || self.write_enabled;
                if writable && self.can_access(count) {
                    self.memory[addr as usize] = byte;
                }
                Phase::Data {
                    opcode,
                    addr: self.advance(addr),
                    count: count + 1,
                }
            }
            Phase::RegisterWrite => {
                if !self.is_latched() {
                    self.mode = byte & opcodes::MR_MODE_MASK;
                } else if self.write_enabled {
                    self.status = byte & SR_WRITABLE;
                }
                Phase::Ignore
            }
            other => other,
        };
    }

    /// Clock one byte out to the host
    fn shift_out(&mut self) -> u8 {
        let phase = self.phase;
        match phase {
            Phase::Data {
                opcode,
                addr,
                count,
            } if opcode == self.config.profile.opcodes.read => {
                let byte = if self.can_access(count) {
                    self.memory[addr as usize]
                } else {
                    0xFF
                };
                self.phase = Phase::Data {
                    opcode,
                    addr: self.advance(addr),
                    count: count + 1,
                };
                byte
            }
            Phase::RegisterRead => {
                if self.is_latched() {
                    self.status()
                } else {
                    self.mode
                }
            }
            Phase::DeviceId { index } => {
                self.phase = Phase::DeviceId { index: index + 1 };
                self.config.device_id.get(index).copied().unwrap_or(0)
            }
            _ => 0xFF,
        }
    }

    /// CS went inactive: the chip commits the frame
    fn end_frame(&mut self) {
        let ops = self.config.profile.opcodes;
        if let Some(opcode) = self.frame_opcode.take() {
            let committed = opcode == ops.write || Some(opcode) == ops.write_register;
            if self.is_latched() && committed {
                self.write_enabled = false;
            }
        }
        self.phase = Phase::Ignore;
    }
}

impl HostTransport for DummyRam {
    fn assert_chip_select(&mut self) -> Result<()> {
        self.next_cs_op()?;
        self.events.push(BusEvent::Assert);
        if !self.cs_active {
            self.cs_active = true;
            self.phase = Phase::Opcode;
        }
        Ok(())
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        self.next_cs_op()?;
        self.events.push(BusEvent::Deassert);
        if self.cs_active {
            self.cs_active = false;
            self.end_frame();
        }
        Ok(())
    }

    fn transfer(&mut self, out: &[u8]) -> Result<()> {
        self.events.push(BusEvent::Transfer(out.to_vec()));
        self.next_transfer()?;
        for &byte in out {
            self.shift_in(byte);
        }
        Ok(())
    }

    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()> {
        self.events
            .push(BusEvent::TransferThenReceive(out.to_vec(), buf.len()));
        self.next_transfer()?;
        for &byte in out {
            self.shift_in(byte);
        }
        for slot in buf.iter_mut() {
            *slot = self.shift_out();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiram_core::chip::{find_builtin, M23LCV512};
    use spiram_core::device::{RamDevice, RamDeviceExt};
    use spiram_core::protocol;
    use spiram_core::session::DeviceSession;

    fn sram() -> DummyRam {
        DummyRam::new(DummyConfig {
            profile: M23LCV512,
            device_id: [0; 4],
            fill: 0x00,
        })
    }

    #[test]
    fn test_round_trip_both_chips() {
        for name in ["MB85RS64V", "23LCV512"] {
            let chip = find_builtin(name).unwrap();
            let mut ram = DummyRam::for_chip(chip);
            let mut session = DeviceSession::attach(chip.profile, &mut ram);

            session.set_address(0x23).unwrap();
            assert_eq!(session.write(b"testinggg"), Ok(9));

            session.set_size(9).unwrap();
            let mut buf = [0u8; 9];
            assert_eq!(session.read(&mut buf), Ok(9));
            assert_eq!(&buf, b"testinggg", "{}", name);
            drop(session);

            assert_eq!(&ram.memory()[0x23..0x23 + 9], b"testinggg");
            assert!(!ram.write_enabled());
            assert!(!ram.cs_active());
        }
    }

    #[test]
    fn test_fram_ignores_write_without_latch() {
        let mut ram = DummyRam::new_default();
        protocol::with_chip_select(&mut ram, |t| t.transfer(&[opcodes::WRITE, 0x00, 0x10, 0xAA]))
            .unwrap();
        assert_eq!(ram.memory()[0x10], 0x00);

        protocol::write(&mut ram, &MB85RS64V, 0x10, &[0xAA]).unwrap();
        assert_eq!(ram.memory()[0x10], 0xAA);
    }

    #[test]
    fn test_latch_cleared_after_write_frame() {
        let mut ram = DummyRam::new_default();
        protocol::write_enable(&mut ram, &MB85RS64V).unwrap();
        assert!(ram.write_enabled());
        assert_eq!(protocol::read_register(&mut ram, &MB85RS64V), Ok(opcodes::SR_WEL));

        protocol::with_chip_select(&mut ram, |t| t.transfer(&[opcodes::WRITE, 0x00, 0x00, 1]))
            .unwrap();
        assert!(!ram.write_enabled());
    }

    #[test]
    fn test_transfer_needs_cs() {
        let mut ram = DummyRam::new_default();
        assert_eq!(ram.transfer(&[opcodes::WREN]), Err(Error::Transport));
        assert!(!ram.write_enabled());
    }

    #[test]
    fn test_address_wraps_at_capacity() {
        let mut ram = DummyRam::new_default();
        let mut session = DeviceSession::attach(MB85RS64V, &mut ram);
        session.set_address(8190).unwrap();
        session.write(b"wxyz").unwrap();
        drop(session);

        assert_eq!(&ram.memory()[8190..], b"wx");
        assert_eq!(&ram.memory()[..2], b"yz");
    }

    #[test]
    fn test_listen_and_stream() {
        let mut ram = sram();
        {
            let mut session = DeviceSession::attach(M23LCV512, &mut ram);
            session.set_address(0x100).unwrap();
            session.set_listening(true).unwrap();
            session.stream(b"hello ").unwrap();
            session.stream(b"world").unwrap();
            session.set_listening(false).unwrap();
        }
        assert_eq!(&ram.memory()[0x100..0x10B], b"hello world");
    }

    #[test]
    fn test_fram_listen_and_stream() {
        let mut ram = DummyRam::new_default();
        {
            let mut session = DeviceSession::attach(MB85RS64V, &mut ram);
            session.set_address(0x40).unwrap();
            session.enter_listen().unwrap();
            session.stream(b"abc").unwrap();
            session.exit_listen().unwrap();
        }
        assert_eq!(&ram.memory()[0x40..0x43], b"abc");
        assert!(!ram.write_enabled());
    }

    #[test]
    fn test_drop_exits_listen() {
        let mut ram = DummyRam::new_default();
        {
            let mut session = DeviceSession::attach(MB85RS64V, &mut ram);
            session.enter_listen().unwrap();
            session.stream(b"z").unwrap();
        }
        assert!(!ram.cs_active());
        assert!(!ram.write_enabled());
        assert_eq!(ram.memory()[0], b'z');
    }

    #[test]
    fn test_failed_data_transfer_closes_latch() {
        let mut ram = DummyRam::new_default();
        // WREN succeeds, data frame fails
        ram.fail_transfer_at(1);
        let mut session = DeviceSession::attach(MB85RS64V, &mut ram);
        session.set_address(0).unwrap();
        assert_eq!(session.write(b"x"), Err(Error::Transport));
        drop(session);

        assert!(!ram.cs_active());
        assert!(!ram.write_enabled());
        assert_eq!(ram.transactions().last(), Some(&vec![opcodes::WRDI]));
    }

    #[test]
    fn test_chip_select_failure() {
        let mut ram = sram();
        ram.fail_chip_select_at(0);
        let mut buf = [0u8; 2];
        assert_eq!(
            protocol::read(&mut ram, &M23LCV512, 0, &mut buf),
            Err(Error::ChipSelect)
        );
        assert!(!ram.cs_active());
    }

    #[test]
    fn test_status_register() {
        let mut ram = DummyRam::new_default();
        let mut session = DeviceSession::attach(MB85RS64V, &mut ram);
        session.write_status(opcodes::SR_BP0 | opcodes::SR_WEL).unwrap();
        assert_eq!(session.read_status(), Ok(opcodes::SR_BP0));
        assert_eq!(session.read_device_id(), Ok([0x04, 0x7F, 0x03, 0x02]));
    }

    #[test]
    fn test_sram_page_mode_wraps_in_page() {
        let mut ram = sram();
        let mut session = DeviceSession::attach(M23LCV512, &mut ram);
        session.write_mode(opcodes::MR_PAGE).unwrap();
        assert_eq!(session.read_mode(), Ok(opcodes::MR_PAGE));
        session.set_address(30).unwrap();
        session.write(b"abcd").unwrap();
        drop(session);

        assert_eq!(&ram.memory()[30..32], b"ab");
        assert_eq!(&ram.memory()[0..2], b"cd");
    }

    #[test]
    fn test_sram_byte_mode_single_access() {
        let mut ram = sram();
        let mut session = DeviceSession::attach(M23LCV512, &mut ram);
        session.write_mode(opcodes::MR_BYTE).unwrap();
        session.set_address(5).unwrap();
        session.write(b"xy").unwrap();
        drop(session);

        assert_eq!(ram.memory()[5], b'x');
        assert_eq!(ram.memory()[6], 0);
    }

    #[test]
    fn test_dual_io_toggle() {
        let mut ram = sram();
        protocol::send_command(&mut ram, opcodes::EDIO).unwrap();
        assert!(ram.dual_io());
        protocol::reset_io(&mut ram, &M23LCV512).unwrap();
        assert!(!ram.dual_io());
    }

    #[test]
    fn test_ram_device_read_all() {
        let mut ram = sram();
        ram.memory_mut()[0xFFFF] = 0x5A;
        let mut session = DeviceSession::attach(M23LCV512, &mut ram);
        let all = session.read_all().unwrap();
        assert_eq!(all.len(), 65536);
        assert_eq!(all[0xFFFF], 0x5A);

        RamDevice::write(&mut session, 0xFFFE, b"qq").unwrap();
        let mut buf = [0u8; 2];
        RamDevice::read(&mut session, 0xFFFE, &mut buf).unwrap();
        assert_eq!(&buf, b"qq");
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_control_surface_data_round_trip() {
        use spiram_core::control::ControlSurface;

        let cs = ControlSurface::new(DeviceSession::attach(MB85RS64V, DummyRam::new_default()));
        assert_eq!(cs.store("addr", b"0x23\n"), Ok(5));
        assert_eq!(cs.store("data", b"testinggg"), Ok(9));
        assert_eq!(cs.show("data"), Err(Error::SizeNotSet));
        cs.store("size", b"9").unwrap();
        assert_eq!(cs.show("data").unwrap(), b"testinggg");

        // Rejected pointer keeps the old one
        assert!(matches!(
            cs.store("addr", b"0x2001"),
            Err(Error::AddressOutOfRange { .. })
        ));
        assert_eq!(cs.show("addr").unwrap(), b"0x23\n");
        assert_eq!(cs.show("data").unwrap(), b"testinggg");

        // Last byte of the chip
        cs.store("addr", b"0x1fff").unwrap();
        assert_eq!(cs.store("data", b"z"), Ok(1));
        cs.store("size", b"1").unwrap();
        assert_eq!(cs.show("data").unwrap(), b"z");

        cs.store("addr", b"0x100").unwrap();
        cs.store("listen", b"1\n").unwrap();
        assert_eq!(cs.show("data"), Err(Error::InvalidState));
        assert_eq!(cs.store("data", b"lost"), Err(Error::InvalidState));
        assert_eq!(cs.with_session(|s| s.stream(b"streamed")), Ok(8));
        cs.store("listen", b"0").unwrap();

        cs.store("size", b"8").unwrap();
        assert_eq!(cs.show("data").unwrap(), b"streamed");

        let session = cs.into_session();
        let ram = session.transport();
        assert_eq!(&ram.memory()[0x23..0x2C], b"testinggg");
        assert_eq!(&ram.memory()[0x100..0x108], b"streamed");
        assert_eq!(ram.memory()[0x1FFF], b'z');
        assert!(!ram.write_enabled());
        assert!(!ram.cs_active());
    }
}
