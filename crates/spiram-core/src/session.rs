//! Per-device session state
//!
//! A [`DeviceSession`] is one attached chip: its profile, its exclusively
//! owned transport, the address pointer, the transfer size and the listen
//! state. It validates every request before handing it to the
//! [`protocol`](crate::protocol) engine.
//!
//! Attaching a session is the probe step, dropping (or [`detach`]ing) it is
//! the remove step. A session that is still listening when it goes away
//! releases CS and, on latched parts, closes the write latch.
//!
//! [`detach`]: DeviceSession::detach

use crate::chip::{ChipProfile, Features};
use crate::error::{Error, Result};
use crate::protocol;
use crate::transport::HostTransport;

/// Listen state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// CS released between operations
    #[default]
    Idle,
    /// CS held asserted with a WRITE frame already sent
    Listening,
}

/// One attached serial RAM chip
#[derive(Debug)]
pub struct DeviceSession<T: HostTransport> {
    profile: ChipProfile,
    transport: T,
    address: u32,
    transfer_size: Option<u32>,
    state: SessionState,
}

impl<T: HostTransport> DeviceSession<T> {
    /// Attach a chip: address 0, size unset, idle
    pub fn attach(profile: ChipProfile, transport: T) -> Self {
        log::debug!(
            "spiram: attach {} byte device (latch: {})",
            profile.capacity,
            profile.requires_write_latch()
        );
        Self {
            profile,
            transport,
            address: 0,
            transfer_size: None,
            state: SessionState::Idle,
        }
    }

    /// Detach the chip, leaving listen mode first if needed
    ///
    /// Unlike dropping the session, this reports a failure to leave listen
    /// mode.
    pub fn detach(mut self) -> Result<()> {
        let result = self.exit_listen();
        // Drop must not retry
        self.state = SessionState::Idle;
        result
    }

    /// The chip profile
    pub fn profile(&self) -> &ChipProfile {
        &self.profile
    }

    /// Chip capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.profile.capacity
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current address pointer
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Current transfer size, if one has been set
    pub fn transfer_size(&self) -> Option<u32> {
        self.transfer_size
    }

    /// Current listen state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session is in listen mode
    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// Set the address pointer
    ///
    /// Accepts `0..=capacity`; anything else leaves the pointer unchanged.
    pub fn set_address(&mut self, addr: u32) -> Result<()> {
        if !self.profile.is_valid_address(addr) {
            return Err(Error::AddressOutOfRange {
                addr,
                capacity: self.profile.capacity,
            });
        }
        self.address = addr;
        Ok(())
    }

    /// Set the transfer size used by [`read`](Self::read)
    ///
    /// Accepts `1..=capacity`; anything else leaves the size unchanged.
    pub fn set_size(&mut self, size: u32) -> Result<()> {
        if !self.profile.is_valid_size(size) {
            return Err(Error::SizeOutOfRange {
                size,
                capacity: self.profile.capacity,
            });
        }
        self.transfer_size = Some(size);
        Ok(())
    }

    /// Enter or leave listen mode
    ///
    /// Returns `true` if the state changed, `false` if it already matched.
    pub fn set_listening(&mut self, listen: bool) -> Result<bool> {
        if listen == self.is_listening() {
            return Ok(false);
        }
        if listen {
            self.enter_listen()?;
        } else {
            self.exit_listen()?;
        }
        Ok(true)
    }

    /// Read `transfer_size` bytes at the address pointer into `buf`
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_idle()?;
        let size = self.transfer_size.ok_or(Error::SizeNotSet)? as usize;
        if buf.len() < size {
            return Err(Error::BufferTooSmall);
        }
        protocol::read(
            &mut self.transport,
            &self.profile,
            self.address,
            &mut buf[..size],
        )
    }

    /// Write `data` at the address pointer
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.ensure_idle()?;
        protocol::write(&mut self.transport, &self.profile, self.address, data)
    }

    /// Hold CS with a WRITE frame sent at the address pointer
    ///
    /// No-op if already listening.
    pub fn enter_listen(&mut self) -> Result<()> {
        if self.is_listening() {
            return Ok(());
        }
        protocol::enter_listen(&mut self.transport, &self.profile, self.address)?;
        self.state = SessionState::Listening;
        Ok(())
    }

    /// Release CS and close the write latch
    ///
    /// No-op if idle. Once CS is released the session is idle, even if
    /// closing the latch then fails.
    pub fn exit_listen(&mut self) -> Result<()> {
        if !self.is_listening() {
            return Ok(());
        }
        let state = &mut self.state;
        protocol::exit_listen(&mut self.transport, &self.profile, || {
            *state = SessionState::Idle
        })
    }

    /// Stream payload bytes into the open listen frame
    pub fn stream(&mut self, data: &[u8]) -> Result<usize> {
        if !self.is_listening() {
            return Err(Error::InvalidState);
        }
        protocol::stream(&mut self.transport, data)?;
        Ok(data.len())
    }

    /// Read the FRAM status register
    pub fn read_status(&mut self) -> Result<u8> {
        self.ensure_register(Features::STATUS_REG)?;
        protocol::read_register(&mut self.transport, &self.profile)
    }

    /// Write the FRAM status register
    pub fn write_status(&mut self, value: u8) -> Result<()> {
        self.ensure_register(Features::STATUS_REG)?;
        protocol::write_register(&mut self.transport, &self.profile, value)
    }

    /// Read the SRAM mode register
    pub fn read_mode(&mut self) -> Result<u8> {
        self.ensure_register(Features::MODE_REG)?;
        protocol::read_register(&mut self.transport, &self.profile)
    }

    /// Write the SRAM mode register
    pub fn write_mode(&mut self, value: u8) -> Result<()> {
        self.ensure_register(Features::MODE_REG)?;
        protocol::write_register(&mut self.transport, &self.profile, value)
    }

    /// Read the device ID
    ///
    /// Bytes past the profile's ID length are zero.
    pub fn read_device_id(&mut self) -> Result<[u8; 4]> {
        self.ensure_idle()?;
        let mut id = [0u8; 4];
        protocol::read_device_id(&mut self.transport, &self.profile, &mut id)?;
        Ok(id)
    }

    /// Return a dual I/O part to plain SPI
    pub fn reset_io(&mut self) -> Result<()> {
        self.ensure_idle()?;
        protocol::reset_io(&mut self.transport, &self.profile)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_listening() {
            Err(Error::InvalidState)
        } else {
            Ok(())
        }
    }

    fn ensure_register(&self, feature: Features) -> Result<()> {
        self.ensure_idle()?;
        if self.profile.features.contains(feature) {
            Ok(())
        } else {
            Err(Error::OpcodeNotSupported)
        }
    }
}

impl<T: HostTransport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Err(e) = self.exit_listen() {
            log::warn!("spiram: failed to leave listen mode on detach: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{M23LCV512, MB85RS64V};
    use crate::spi::opcodes;
    use crate::testing::{BusEvent, RecordingTransport};
    use alloc::vec;

    #[test]
    fn test_attach_defaults() {
        let mut bus = RecordingTransport::new();
        let session = DeviceSession::attach(MB85RS64V, &mut bus);
        assert_eq!(session.address(), 0);
        assert_eq!(session.transfer_size(), None);
        assert_eq!(session.state(), SessionState::Idle);
        drop(session);
        assert!(bus.events.is_empty());
    }

    #[test]
    fn test_set_address_range() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(MB85RS64V, &mut bus);

        for addr in [0, 1, 0x23, 8191, 8192] {
            session.set_address(addr).unwrap();
            assert_eq!(session.address(), addr);
        }

        session.set_address(0x100).unwrap();
        assert_eq!(
            session.set_address(8193),
            Err(Error::AddressOutOfRange {
                addr: 8193,
                capacity: 8192
            })
        );
        assert_eq!(session.address(), 0x100);
    }

    #[test]
    fn test_set_size_range() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(M23LCV512, &mut bus);

        session.set_size(1).unwrap();
        session.set_size(65536).unwrap();
        assert_eq!(session.transfer_size(), Some(65536));

        assert!(matches!(
            session.set_size(0),
            Err(Error::SizeOutOfRange { size: 0, .. })
        ));
        assert!(matches!(
            session.set_size(65537),
            Err(Error::SizeOutOfRange { .. })
        ));
        assert_eq!(session.transfer_size(), Some(65536));
    }

    #[test]
    fn test_read_needs_size_and_buffer() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
        let mut buf = [0u8; 4];

        assert_eq!(session.read(&mut buf), Err(Error::SizeNotSet));
        session.set_size(8).unwrap();
        assert_eq!(session.read(&mut buf), Err(Error::BufferTooSmall));
        session.set_size(4).unwrap();
        assert_eq!(session.read(&mut buf), Ok(4));
    }

    #[test]
    fn test_read_uses_pointer_and_size() {
        let mut bus = RecordingTransport::new();
        {
            let mut session = DeviceSession::attach(M23LCV512, &mut bus);
            session.set_address(0x1234).unwrap();
            session.set_size(3).unwrap();
            let mut buf = [0u8; 16];
            assert_eq!(session.read(&mut buf), Ok(3));
        }
        assert_eq!(
            bus.events,
            vec![
                BusEvent::Assert,
                BusEvent::TransferThenReceive(vec![opcodes::READ, 0x12, 0x34], 3),
                BusEvent::Deassert,
            ]
        );
    }

    #[test]
    fn test_listen_is_idempotent() {
        let mut bus = RecordingTransport::new();
        {
            let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
            assert_eq!(session.set_listening(true), Ok(true));
            assert_eq!(session.set_listening(true), Ok(false));
            session.enter_listen().unwrap();
            assert!(session.is_listening());
            assert_eq!(session.set_listening(false), Ok(true));
            assert_eq!(session.set_listening(false), Ok(false));
            session.exit_listen().unwrap();
        }
        // One WREN, one open frame, one WRDI
        assert_eq!(bus.transactions().len(), 3);
    }

    #[test]
    fn test_exit_listen_while_idle_is_silent() {
        let mut bus = RecordingTransport::new();
        {
            let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
            session.exit_listen().unwrap();
        }
        assert!(bus.events.is_empty());
    }

    #[test]
    fn test_busy_while_listening() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(M23LCV512, &mut bus);
        session.set_size(1).unwrap();
        session.enter_listen().unwrap();
        let before = session.transport().events.len();

        let mut buf = [0u8; 1];
        assert_eq!(session.read(&mut buf), Err(Error::InvalidState));
        assert_eq!(session.write(b"x"), Err(Error::InvalidState));
        assert_eq!(session.read_mode(), Err(Error::InvalidState));
        assert_eq!(session.reset_io(), Err(Error::InvalidState));
        assert_eq!(session.transport().events.len(), before);
    }

    #[test]
    fn test_stream_requires_listen() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(M23LCV512, &mut bus);
        assert_eq!(session.stream(b"abc"), Err(Error::InvalidState));

        session.set_address(0x10).unwrap();
        session.enter_listen().unwrap();
        assert_eq!(session.stream(b"abc"), Ok(3));
        session.exit_listen().unwrap();
        drop(session);

        assert_eq!(
            bus.transactions(),
            vec![vec![opcodes::WRITE, 0x00, 0x10, b'a', b'b', b'c']]
        );
    }

    #[test]
    fn test_failed_listen_stays_idle() {
        let mut bus = RecordingTransport::failing_at(0);
        let mut session = DeviceSession::attach(M23LCV512, &mut bus);
        assert_eq!(session.enter_listen(), Err(Error::Transport));
        assert!(!session.is_listening());
        assert!(!session.transport().cs_active());
    }

    #[test]
    fn test_exit_listen_idle_even_if_wrdi_fails() {
        // WREN, open frame, then WRDI fails
        let mut bus = RecordingTransport::failing_at(2);
        let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
        session.enter_listen().unwrap();
        assert_eq!(session.exit_listen(), Err(Error::Transport));
        assert!(!session.is_listening());
        assert!(!session.transport().cs_active());
    }

    #[test]
    fn test_drop_exits_listen() {
        let mut bus = RecordingTransport::new();
        {
            let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
            session.enter_listen().unwrap();
        }
        assert!(!bus.cs_active());
        assert_eq!(bus.transactions().last(), Some(&vec![opcodes::WRDI]));
    }

    #[test]
    fn test_detach_reports_result() {
        let mut bus = RecordingTransport::new();
        let mut session = DeviceSession::attach(M23LCV512, &mut bus);
        session.enter_listen().unwrap();
        session.detach().unwrap();
        assert!(!bus.cs_active());
        assert_eq!(bus.events.last(), Some(&BusEvent::Deassert));
    }

    #[test]
    fn test_register_ops_follow_features() {
        let mut bus = RecordingTransport::new();
        let mut fram = DeviceSession::attach(MB85RS64V, &mut bus);
        assert_eq!(fram.read_mode(), Err(Error::OpcodeNotSupported));
        assert_eq!(fram.reset_io(), Err(Error::OpcodeNotSupported));
        fram.write_status(opcodes::SR_BP0 | opcodes::SR_BP1).unwrap();
        drop(fram);
        assert_eq!(
            bus.transactions(),
            vec![
                vec![opcodes::WREN],
                vec![opcodes::WRSR, opcodes::SR_BP0 | opcodes::SR_BP1]
            ]
        );

        let mut bus = RecordingTransport::new();
        let mut sram = DeviceSession::attach(M23LCV512, &mut bus);
        assert_eq!(sram.read_status(), Err(Error::OpcodeNotSupported));
        assert_eq!(sram.read_device_id(), Err(Error::OpcodeNotSupported));
        sram.write_mode(opcodes::MR_SEQUENTIAL).unwrap();
    }

    #[test]
    fn test_device_id() {
        let mut bus = RecordingTransport::new();
        bus.response = vec![0x04, 0x7F, 0x03, 0x02];
        let mut session = DeviceSession::attach(MB85RS64V, &mut bus);
        assert_eq!(session.read_device_id(), Ok([0x04, 0x7F, 0x03, 0x02]));
    }
}
