//! Backend registry and initialization
//!
//! This module handles opening backends by name and creating RamHandles.

use crate::handle::{ChipInfo, RamHandle};
#[allow(unused_imports)] // Used in feature-gated code
use crate::handle::{AttributeDevice, BoxedTransport};
use spiram_core::chip::{ChipDatabase, RamChip};
#[allow(unused_imports)] // Used in feature-gated code
use spiram_core::session::DeviceSession;
use std::collections::HashMap;

/// Parsed backend parameters
#[derive(Debug, Clone)]
pub struct BackendParams {
    /// Backend name
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl BackendParams {
    /// Backend-specific options, without the generic `chip` key
    pub fn backend_options(&self) -> Vec<(&str, &str)> {
        let mut opts: Vec<(&str, &str)> = self
            .params
            .iter()
            .filter(|(k, _)| k.as_str() != "chip")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        opts.sort();
        opts
    }
}

/// Parse a backend string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_backend_params("dummy:chip=23LCV512")?;
/// assert_eq!(params.name, "dummy");
/// assert_eq!(params.params.get("chip"), Some(&"23LCV512".to_string()));
/// ```
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Look up the chip named by the `chip=` parameter
fn find_chip<'a>(
    params: &BackendParams,
    db: &'a ChipDatabase,
    default: Option<&str>,
) -> Result<&'a RamChip, Box<dyn std::error::Error>> {
    let name = params
        .params
        .get("chip")
        .map(String::as_str)
        .or(default)
        .ok_or_else(|| format!("Backend '{}' needs chip=<name>", params.name))?;

    let chip = db
        .find_by_name(name)
        .ok_or_else(|| format!("Unknown chip: {} (see list-chips)", name))?;
    log::info!(
        "Using {} {} ({} bytes)",
        chip.vendor,
        chip.name,
        chip.profile.capacity
    );
    Ok(chip)
}

/// Attach a session to a transport and wrap it in a handle
#[allow(dead_code)] // Only used by feature-gated backends
fn attach(transport: BoxedTransport, chip: &RamChip) -> RamHandle {
    let session = DeviceSession::attach(chip.profile, transport);
    RamHandle::with_session(session, ChipInfo::from(chip))
}

/// Open a backend and create a RamHandle
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the backend string
/// 2. Looking up the chip profile
/// 3. Opening the appropriate backend
/// 4. Creating a unified RamHandle
///
/// # Arguments
/// * `backend` - Backend string (e.g., "dummy" or "linux_spi:chip=MB85RS64V,dev=/dev/spidev0.0")
/// * `db` - Chip database for the `chip=` lookup
pub fn open_ram(backend: &str, db: &ChipDatabase) -> Result<RamHandle, Box<dyn std::error::Error>> {
    let params = parse_backend_params(backend)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, db),

        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linux-spi" | "spidev" => open_linux_spi(&params, db),

        #[cfg(feature = "sysfs")]
        "sysfs" => open_sysfs(&params, db),

        _ => Err(format!("Unknown backend: {}", params.name).into()),
    }
}

// Backend-specific open functions

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &BackendParams,
    db: &ChipDatabase,
) -> Result<RamHandle, Box<dyn std::error::Error>> {
    use spiram_dummy::{DummyConfig, DummyRam};

    let chip = find_chip(params, db, Some("MB85RS64V"))?;
    let mut config = DummyConfig {
        profile: chip.profile,
        device_id: chip.device_id.unwrap_or_default(),
        ..DummyConfig::default()
    };
    for (key, value) in params.backend_options() {
        match key {
            "fill" => {
                let digits = value.trim_start_matches("0x");
                config.fill = u8::from_str_radix(digits, 16)
                    .map_err(|_| format!("Invalid fill value: {}", value))?;
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    Ok(attach(Box::new(DummyRam::new(config)), chip))
}

#[cfg(feature = "linux-spi")]
fn open_linux_spi(
    params: &BackendParams,
    db: &ChipDatabase,
) -> Result<RamHandle, Box<dyn std::error::Error>> {
    let chip = find_chip(params, db, None)?;
    // Chip default clock, in kHz like the option itself
    let default_speed = (chip.profile.max_speed_hz / 1000).max(1).to_string();
    let mut options = params.backend_options();
    if !options.iter().any(|(k, _)| *k == "spispeed") {
        options.push(("spispeed", default_speed.as_str()));
    }
    let transport = spiram_linux_spi::open_linux_spi(&options)?;
    Ok(attach(Box::new(transport), chip))
}

#[cfg(feature = "sysfs")]
struct SysfsDevice(spiram_sysfs::SysfsRam);

#[cfg(feature = "sysfs")]
impl AttributeDevice for SysfsDevice {
    fn device(&mut self) -> &mut dyn spiram_core::device::RamDevice {
        &mut self.0
    }

    fn show_attribute(&mut self, name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.0.show_attribute(name).map_err(Into::into)
    }

    fn store_attribute(
        &mut self,
        name: &str,
        value: &[u8],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        self.0.store_attribute(name, value).map_err(Into::into)
    }
}

#[cfg(feature = "sysfs")]
fn open_sysfs(
    params: &BackendParams,
    db: &ChipDatabase,
) -> Result<RamHandle, Box<dyn std::error::Error>> {
    let chip = find_chip(params, db, None)?;
    let path = params
        .params
        .get("path")
        .ok_or("sysfs backend needs path=<device directory>")?;
    let ram = spiram_sysfs::SysfsRam::open(path)?.with_capacity(chip.profile.capacity);
    Ok(RamHandle::from_device(
        Box::new(SysfsDevice(ram)),
        ChipInfo::from(chip),
    ))
}

// Backend information and listing
/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory FRAM/SRAM emulator for testing (chip=<name>,fill=<hex>)",
    });

    #[cfg(feature = "linux-spi")]
    backends.push(BackendInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev with GPIO chip select (dev=/dev/spidevX.Y,gpiochip=N,cs=N)",
    });

    #[cfg(feature = "sysfs")]
    backends.push(BackendInfo {
        name: "sysfs",
        aliases: &[],
        description: "Attribute files of a loaded kernel driver (path=<dir>)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    if backends.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let p = parse_backend_params("linux_spi:chip=MB85RS64V,dev=/dev/spidev0.0").unwrap();
        assert_eq!(p.name, "linux_spi");
        assert_eq!(p.params.get("chip").map(String::as_str), Some("MB85RS64V"));
        assert_eq!(p.backend_options(), vec![("dev", "/dev/spidev0.0")]);

        let p = parse_backend_params("dummy").unwrap();
        assert_eq!(p.name, "dummy");
        assert!(p.params.is_empty());

        assert!(parse_backend_params("dummy:chip").is_err());
    }

    #[test]
    fn test_unknown_backend() {
        let db = ChipDatabase::with_builtin();
        assert!(open_ram("bogus", &db).is_err());
    }

    #[test]
    fn test_unknown_chip() {
        let db = ChipDatabase::with_builtin();
        let p = parse_backend_params("dummy:chip=W25Q128").unwrap();
        assert!(find_chip(&p, &db, None).is_err());
        let p = parse_backend_params("dummy").unwrap();
        assert!(find_chip(&p, &db, None).is_err());
        assert_eq!(
            find_chip(&p, &db, Some("23lcv512")).unwrap().name,
            "23LCV512"
        );
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_round_trip() {
        let db = ChipDatabase::with_builtin();
        for spec in ["dummy", "dummy:chip=23LCV512,fill=ff"] {
            let mut handle = open_ram(spec, &db).unwrap();
            handle.write(0x23, b"testinggg").unwrap();
            let mut buf = [0u8; 9];
            handle.read(0x23, &mut buf).unwrap();
            assert_eq!(&buf, b"testinggg", "{}", spec);
        }
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_listen_stream() {
        let db = ChipDatabase::with_builtin();
        let mut handle = open_ram("dummy:chip=MB85RS64V", &db).unwrap();
        handle.seek(0x100).unwrap();
        assert!(handle.set_listen(true).unwrap());
        assert!(handle.is_listening());
        handle.stream(b"streamed").unwrap();
        assert!(handle.set_listen(false).unwrap());

        let mut buf = [0u8; 8];
        handle.read(0x100, &mut buf).unwrap();
        assert_eq!(&buf, b"streamed");
        assert_eq!(handle.read_device_id().unwrap(), [0x04, 0x7F, 0x03, 0x02]);
    }

    #[test]
    fn test_available_backends() {
        let names = backend_names_short();
        #[cfg(feature = "dummy")]
        assert!(names.contains("dummy"));
        assert!(!names.is_empty());
    }
}
