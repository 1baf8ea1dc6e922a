//! RamHandle - unified abstraction over chip + backend
//!
//! Combines chip information and backend access into a single handle, so
//! the CLI never needs to know whether it is driving the bus itself or
//! going through a kernel driver's attribute files.

use spiram_core::chip::RamChip;
use spiram_core::control::ControlSurface;
use spiram_core::device::RamDevice;
use spiram_core::session::DeviceSession;
use spiram_core::transport::HostTransport;

/// Type-erased host transport owned by a session
pub type BoxedTransport = Box<dyn HostTransport + Send>;

/// Chip information available from a RamHandle
#[derive(Debug, Clone)]
pub struct ChipInfo {
    /// Vendor name (e.g., "Fujitsu")
    pub vendor: String,
    /// Chip name (e.g., "MB85RS64V")
    pub name: String,
    /// Capacity in bytes
    pub capacity: u32,
    /// Expected RDID response, if the part has one
    pub device_id: Option<[u8; 4]>,
    /// Whether writes are bracketed by WREN/WRDI
    pub write_latch: bool,
}

impl From<&RamChip> for ChipInfo {
    fn from(chip: &RamChip) -> Self {
        Self {
            vendor: chip.vendor.clone(),
            name: chip.name.clone(),
            capacity: chip.profile.capacity,
            device_id: chip.device_id,
            write_latch: chip.profile.requires_write_latch(),
        }
    }
}

/// How the handle reaches the chip
enum Backend {
    /// Bus driven directly through a session
    Session(ControlSurface<BoxedTransport>),
    /// Any other device, with its own attribute access
    Device(Box<dyn AttributeDevice>),
}

/// A device that exposes its own named attributes
pub trait AttributeDevice: Send {
    /// The device itself
    fn device(&mut self) -> &mut dyn RamDevice;

    /// Render the named attribute
    fn show_attribute(&mut self, name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Store into the named attribute, returning bytes consumed
    fn store_attribute(
        &mut self,
        name: &str,
        value: &[u8],
    ) -> Result<usize, Box<dyn std::error::Error>>;
}

/// Unified serial RAM handle
///
/// The handle owns the device (which includes the transport). Dropping it
/// leaves listen mode.
pub struct RamHandle {
    backend: Backend,
    chip_info: ChipInfo,
}

impl RamHandle {
    /// Create a handle around a session on a bus the caller drives
    pub(crate) fn with_session(session: DeviceSession<BoxedTransport>, chip_info: ChipInfo) -> Self {
        Self {
            backend: Backend::Session(ControlSurface::new(session)),
            chip_info,
        }
    }

    /// Create a handle around another kind of device
    #[allow(dead_code)] // Only used by feature-gated backends
    pub(crate) fn from_device(device: Box<dyn AttributeDevice>, chip_info: ChipInfo) -> Self {
        Self {
            backend: Backend::Device(device),
            chip_info,
        }
    }

    /// Get chip information
    pub fn chip_info(&self) -> &ChipInfo {
        &self.chip_info
    }

    /// Get capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.chip_info.capacity
    }

    /// Run `f` with the underlying RamDevice
    pub fn with_device<R>(&mut self, f: impl FnOnce(&mut dyn RamDevice) -> R) -> R {
        match &mut self.backend {
            Backend::Session(surface) => surface.with_session(|s| f(s)),
            Backend::Device(device) => f(device.device()),
        }
    }

    /// Read data at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.with_device(|d| d.read(addr, buf)).map_err(Into::into)
    }

    /// Write data at `addr`
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.with_device(|d| d.write(addr, data)).map_err(Into::into)
    }

    /// Move the address pointer used by listen mode
    pub fn seek(&mut self, addr: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.with_device(|d| d.seek(addr)).map_err(Into::into)
    }

    /// Enter or leave listen mode, returning whether the state changed
    pub fn set_listen(&mut self, listen: bool) -> Result<bool, Box<dyn std::error::Error>> {
        self.with_device(|d| d.set_listen(listen))
            .map_err(Into::into)
    }

    /// Whether the device is in listen mode
    pub fn is_listening(&mut self) -> bool {
        self.with_device(|d| d.is_listening())
    }

    /// Stream payload bytes while listening
    pub fn stream(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.with_device(|d| d.stream(data)).map_err(Into::into)
    }

    /// Read the status (FRAM) or mode (SRAM) register
    pub fn read_register(&mut self) -> Result<u8, Box<dyn std::error::Error>> {
        self.with_device(|d| d.read_register()).map_err(Into::into)
    }

    /// Read the device ID
    pub fn read_device_id(&mut self) -> Result<[u8; 4], Box<dyn std::error::Error>> {
        self.with_device(|d| d.read_device_id()).map_err(Into::into)
    }

    /// Names of the attributes this handle exposes
    pub fn attribute_names(&self) -> Vec<&'static str> {
        match &self.backend {
            Backend::Session(surface) => surface.attribute_names(),
            Backend::Device(_) => vec!["addr", "size", "listen", "data"],
        }
    }

    /// Render the named attribute
    pub fn show_attribute(&mut self, name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        match &mut self.backend {
            Backend::Session(surface) => surface.show(name).map_err(Into::into),
            Backend::Device(device) => device.show_attribute(name),
        }
    }

    /// Store into the named attribute, returning bytes consumed
    pub fn store_attribute(
        &mut self,
        name: &str,
        value: &[u8],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        match &mut self.backend {
            Backend::Session(surface) => surface.store(name, value).map_err(Into::into),
            Backend::Device(device) => device.store_attribute(name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiram_core::chip::ChipDatabase;
    use spiram_core::error::Result as CoreResult;

    /// Bus with nothing attached
    #[derive(Default)]
    struct NullTransport;

    impl HostTransport for NullTransport {
        fn assert_chip_select(&mut self) -> CoreResult<()> {
            Ok(())
        }

        fn deassert_chip_select(&mut self) -> CoreResult<()> {
            Ok(())
        }

        fn transfer(&mut self, _out: &[u8]) -> CoreResult<()> {
            Ok(())
        }

        fn transfer_then_receive(&mut self, _out: &[u8], buf: &mut [u8]) -> CoreResult<()> {
            buf.fill(0xFF);
            Ok(())
        }
    }

    fn handle(name: &str) -> RamHandle {
        let db = ChipDatabase::with_builtin();
        let chip = db.find_by_name(name).unwrap();
        let transport: BoxedTransport = Box::new(NullTransport);
        let session = DeviceSession::attach(chip.profile, transport);
        RamHandle::with_session(session, ChipInfo::from(chip))
    }

    /// Attribute device backed by a plain buffer
    struct MemoryDevice {
        mem: Vec<u8>,
        listening: bool,
    }

    impl RamDevice for MemoryDevice {
        fn capacity(&self) -> u32 {
            self.mem.len() as u32
        }

        fn read(&mut self, addr: u32, buf: &mut [u8]) -> CoreResult<()> {
            let start = addr as usize;
            buf.copy_from_slice(&self.mem[start..start + buf.len()]);
            Ok(())
        }

        fn write(&mut self, addr: u32, data: &[u8]) -> CoreResult<()> {
            let start = addr as usize;
            self.mem[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn seek(&mut self, _addr: u32) -> CoreResult<()> {
            Ok(())
        }

        fn set_listen(&mut self, listen: bool) -> CoreResult<bool> {
            let changed = self.listening != listen;
            self.listening = listen;
            Ok(changed)
        }

        fn is_listening(&self) -> bool {
            self.listening
        }
    }

    impl AttributeDevice for MemoryDevice {
        fn device(&mut self) -> &mut dyn RamDevice {
            self
        }

        fn show_attribute(&mut self, name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
            match name {
                "listen" => Ok(format!("{}\n", u8::from(self.listening)).into_bytes()),
                _ => Err(format!("no attribute {}", name).into()),
            }
        }

        fn store_attribute(
            &mut self,
            name: &str,
            value: &[u8],
        ) -> Result<usize, Box<dyn std::error::Error>> {
            match name {
                "listen" => {
                    self.listening = value.starts_with(b"1");
                    Ok(value.len())
                }
                _ => Err(format!("no attribute {}", name).into()),
            }
        }
    }

    #[test]
    fn test_device_backed_handle() {
        let db = ChipDatabase::with_builtin();
        let chip = db.find_by_name("MB85RS64V").unwrap();
        let device = MemoryDevice {
            mem: vec![0; chip.profile.capacity as usize],
            listening: false,
        };
        let mut h = RamHandle::from_device(Box::new(device), ChipInfo::from(chip));

        assert_eq!(h.with_device(|d| d.capacity()), 8192);
        h.write(0x23, b"testinggg").unwrap();
        let mut buf = [0u8; 9];
        h.read(0x23, &mut buf).unwrap();
        assert_eq!(&buf, b"testinggg");

        assert_eq!(h.attribute_names(), ["addr", "size", "listen", "data"]);
        assert_eq!(h.store_attribute("listen", b"1").unwrap(), 1);
        assert!(h.is_listening());
        assert_eq!(h.show_attribute("listen").unwrap(), b"1\n");
        assert!(h.read_register().is_err());
        assert!(h.show_attribute("nope").is_err());
    }

    #[test]
    fn test_chip_info() {
        let h = handle("MB85RS64V");
        assert_eq!(h.capacity(), 8192);
        assert!(h.chip_info().write_latch);
        assert_eq!(h.chip_info().device_id, Some([0x04, 0x7F, 0x03, 0x02]));
    }

    #[test]
    fn test_attributes_through_handle() {
        let mut h = handle("23LCV512");
        assert_eq!(h.attribute_names(), ["addr", "size", "listen", "data"]);
        assert_eq!(h.store_attribute("addr", b"0x10").unwrap(), 4);
        assert_eq!(h.show_attribute("addr").unwrap(), b"0x10\n");
        assert!(h.show_attribute("nope").is_err());
    }
}
