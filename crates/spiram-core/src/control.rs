//! Attribute control surface
//!
//! Exposes a [`DeviceSession`] as four named attributes, each a
//! `show`/`store` pair over bytes:
//!
//! | name     | show                 | store                             |
//! |----------|----------------------|-----------------------------------|
//! | `addr`   | `0x{hex}\n`          | hex, optional `0x` prefix         |
//! | `size`   | `{decimal}\n`        | decimal                           |
//! | `listen` | `0\n` or `1\n`       | `0` or `1`                        |
//! | `data`   | `size` raw bytes     | raw bytes written at `addr`       |
//!
//! Text input may carry surrounding whitespace. `store` returns the number
//! of input bytes consumed, which is always the whole input.
//!
//! The session sits behind a mutex so requests from several threads are
//! serialized.

use std::boxed::Box;
use std::string::String;
use std::sync::{Mutex, MutexGuard};
use std::vec;
use std::vec::Vec;

use crate::error::{Error, Result};
use crate::session::DeviceSession;
use crate::transport::HostTransport;

/// One named attribute of a device session
pub trait Attribute<T: HostTransport> {
    /// Attribute name
    fn name(&self) -> &'static str;

    /// Render the attribute
    fn show(&self, session: &mut DeviceSession<T>) -> Result<Vec<u8>>;

    /// Apply `input`, returning the number of bytes consumed
    fn store(&self, session: &mut DeviceSession<T>, input: &[u8]) -> Result<usize>;
}

fn parse_text(input: &[u8]) -> Result<&str> {
    core::str::from_utf8(input)
        .map(str::trim)
        .map_err(|_| Error::Parse)
}

fn parse_hex(input: &[u8]) -> Result<u32> {
    let text = parse_text(input)?;
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|_| Error::Parse)
}

fn parse_decimal(input: &[u8]) -> Result<u32> {
    parse_text(input)?.parse().map_err(|_| Error::Parse)
}

/// `addr`: the address pointer
#[derive(Debug, Default, Clone, Copy)]
pub struct AddrAttribute;

impl<T: HostTransport> Attribute<T> for AddrAttribute {
    fn name(&self) -> &'static str {
        "addr"
    }

    fn show(&self, session: &mut DeviceSession<T>) -> Result<Vec<u8>> {
        Ok(std::format!("0x{:x}\n", session.address()).into_bytes())
    }

    fn store(&self, session: &mut DeviceSession<T>, input: &[u8]) -> Result<usize> {
        session.set_address(parse_hex(input)?)?;
        Ok(input.len())
    }
}

/// `size`: the transfer size for `data` reads
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeAttribute;

impl<T: HostTransport> Attribute<T> for SizeAttribute {
    fn name(&self) -> &'static str {
        "size"
    }

    fn show(&self, session: &mut DeviceSession<T>) -> Result<Vec<u8>> {
        let size = session.transfer_size().unwrap_or(0);
        Ok(std::format!("{}\n", size).into_bytes())
    }

    fn store(&self, session: &mut DeviceSession<T>, input: &[u8]) -> Result<usize> {
        session.set_size(parse_decimal(input)?)?;
        Ok(input.len())
    }
}

/// `listen`: the listen state
#[derive(Debug, Default, Clone, Copy)]
pub struct ListenAttribute;

impl<T: HostTransport> Attribute<T> for ListenAttribute {
    fn name(&self) -> &'static str {
        "listen"
    }

    fn show(&self, session: &mut DeviceSession<T>) -> Result<Vec<u8>> {
        let flag = if session.is_listening() { b'1' } else { b'0' };
        Ok(vec![flag, b'\n'])
    }

    fn store(&self, session: &mut DeviceSession<T>, input: &[u8]) -> Result<usize> {
        let listen = match parse_text(input)? {
            "0" => false,
            "1" => true,
            _ => return Err(Error::Parse),
        };
        session.set_listening(listen)?;
        Ok(input.len())
    }
}

/// `data`: memory contents at the address pointer
#[derive(Debug, Default, Clone, Copy)]
pub struct DataAttribute;

impl<T: HostTransport> Attribute<T> for DataAttribute {
    fn name(&self) -> &'static str {
        "data"
    }

    fn show(&self, session: &mut DeviceSession<T>) -> Result<Vec<u8>> {
        let size = session.transfer_size().ok_or(Error::SizeNotSet)?;
        let mut buf = vec![0u8; size as usize];
        let n = session.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn store(&self, session: &mut DeviceSession<T>, input: &[u8]) -> Result<usize> {
        session.write(input)
    }
}

/// A device session with its attributes, dispatched by name
pub struct ControlSurface<T: HostTransport> {
    session: Mutex<DeviceSession<T>>,
    attributes: Vec<Box<dyn Attribute<T> + Send + Sync>>,
}

impl<T: HostTransport + 'static> ControlSurface<T> {
    /// Wrap a session with the `addr`, `size`, `listen` and `data` attributes
    pub fn new(session: DeviceSession<T>) -> Self {
        Self {
            session: Mutex::new(session),
            attributes: vec![
                Box::new(AddrAttribute),
                Box::new(SizeAttribute),
                Box::new(ListenAttribute),
                Box::new(DataAttribute),
            ],
        }
    }
}

impl<T: HostTransport> ControlSurface<T> {
    /// Names of all attributes, in registration order
    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.attributes.iter().map(|a| a.name()).collect()
    }

    /// Render the named attribute
    pub fn show(&self, name: &str) -> Result<Vec<u8>> {
        let attr = self.find(name)?;
        attr.show(&mut self.lock())
    }

    /// Store `input` into the named attribute
    pub fn store(&self, name: &str, input: &[u8]) -> Result<usize> {
        let attr = self.find(name)?;
        log::debug!("control: store {} ({} bytes)", name, input.len());
        attr.store(&mut self.lock(), input)
    }

    /// Run `f` with exclusive access to the session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut DeviceSession<T>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Unwrap the session
    pub fn into_session(self) -> DeviceSession<T> {
        self.session
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find(&self, name: &str) -> Result<&(dyn Attribute<T> + Send + Sync)> {
        self.attributes
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
            .ok_or(Error::UnknownAttribute)
    }

    fn lock(&self) -> MutexGuard<'_, DeviceSession<T>> {
        // Session state is consistent between operations
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: HostTransport> core::fmt::Debug for ControlSurface<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlSurface")
            .field("attributes", &self.attribute_names())
            .finish_non_exhaustive()
    }
}

/// Convenience: the attribute value as text (for `addr`, `size`, `listen`)
pub fn show_text<T: HostTransport>(surface: &ControlSurface<T>, name: &str) -> Result<String> {
    let bytes = surface.show(name)?;
    String::from_utf8(bytes).map_err(|_| Error::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{M23LCV512, MB85RS64V};
    use crate::spi::opcodes;
    use crate::testing::RecordingTransport;

    fn fram() -> ControlSurface<RecordingTransport> {
        ControlSurface::new(DeviceSession::attach(MB85RS64V, RecordingTransport::new()))
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(fram().attribute_names(), ["addr", "size", "listen", "data"]);
    }

    #[test]
    fn test_addr_formats() {
        let cs = fram();
        assert_eq!(show_text(&cs, "addr").unwrap(), "0x0\n");

        assert_eq!(cs.store("addr", b"0x23\n"), Ok(5));
        assert_eq!(show_text(&cs, "addr").unwrap(), "0x23\n");

        cs.store("addr", b"1FFF").unwrap();
        assert_eq!(show_text(&cs, "addr").unwrap(), "0x1fff\n");

        assert_eq!(cs.store("addr", b"zz"), Err(Error::Parse));
        assert!(matches!(
            cs.store("addr", b"0x2001"),
            Err(Error::AddressOutOfRange { .. })
        ));
        assert_eq!(show_text(&cs, "addr").unwrap(), "0x1fff\n");
    }

    #[test]
    fn test_size_formats() {
        let cs = fram();
        assert_eq!(show_text(&cs, "size").unwrap(), "0\n");
        assert_eq!(cs.store("size", b" 9 \n"), Ok(4));
        assert_eq!(show_text(&cs, "size").unwrap(), "9\n");
        assert_eq!(cs.store("size", b"0x10"), Err(Error::Parse));
        assert!(matches!(
            cs.store("size", b"0"),
            Err(Error::SizeOutOfRange { .. })
        ));
        assert_eq!(show_text(&cs, "size").unwrap(), "9\n");
    }

    #[test]
    fn test_listen_formats() {
        let cs = ControlSurface::new(DeviceSession::attach(M23LCV512, RecordingTransport::new()));
        assert_eq!(cs.show("listen").unwrap(), b"0\n");
        assert_eq!(cs.store("listen", b"1\n"), Ok(2));
        assert_eq!(cs.show("listen").unwrap(), b"1\n");
        assert_eq!(cs.store("listen", b"2"), Err(Error::Parse));
        assert_eq!(cs.store("listen", b"yes"), Err(Error::Parse));
        cs.store("listen", b"0").unwrap();
        assert_eq!(cs.show("listen").unwrap(), b"0\n");
    }

    #[test]
    fn test_data_round_trip_frames() {
        let cs = fram();
        cs.store("addr", b"0x23").unwrap();
        assert_eq!(cs.store("data", b"testinggg"), Ok(9));

        cs.with_session(|s| {
            let txs = s.transport().transactions();
            assert_eq!(txs.len(), 3);
            assert_eq!(txs[1][..3], [opcodes::WRITE, 0x00, 0x23]);
        });

        assert_eq!(cs.show("data"), Err(Error::SizeNotSet));
        cs.store("size", b"9").unwrap();
        assert_eq!(cs.show("data").unwrap().len(), 9);
    }

    #[test]
    fn test_unknown_attribute() {
        let cs = fram();
        assert_eq!(cs.show("bogus"), Err(Error::UnknownAttribute));
        assert_eq!(cs.store("bogus", b"1"), Err(Error::UnknownAttribute));
    }

    #[test]
    fn test_into_session() {
        let cs = fram();
        cs.store("addr", b"10").unwrap();
        let session = cs.into_session();
        assert_eq!(session.address(), 0x10);
    }
}
