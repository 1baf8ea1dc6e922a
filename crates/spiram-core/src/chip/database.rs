//! Chip database for runtime loading and lookup
//!
//! This module provides the `ChipDatabase` type, seeded from the built-in
//! table and extendable with chip definitions from RON files.

use alloc::{string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use super::types::{ChipProfile, OpcodeSet, BUILTIN_CHIPS, DEFAULT_SPEED_HZ};
use super::Features;
use crate::spi::AddressWidth;

/// Error type for chip database operations
#[derive(Debug, thiserror::Error)]
pub enum ChipDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Convert to bytes, `None` if the size does not fit in a `u32`
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
        }
    }
}

/// Opcode family a chip belongs to
#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum FamilyDef {
    Fram,
    Sram,
}

impl FamilyDef {
    fn opcodes(self) -> OpcodeSet {
        match self {
            FamilyDef::Fram => OpcodeSet::FRAM,
            FamilyDef::Sram => OpcodeSet::SRAM,
        }
    }
}

/// Feature flags (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(default)]
struct FeaturesDef {
    write_latch: bool,
    status_reg: bool,
    mode_reg: bool,
    device_id: bool,
    dual_io: bool,
}

impl From<FeaturesDef> for Features {
    fn from(def: FeaturesDef) -> Self {
        let mut f = Features::empty();
        f.set(Features::WRITE_LATCH, def.write_latch);
        f.set(Features::STATUS_REG, def.status_reg);
        f.set(Features::MODE_REG, def.mode_reg);
        f.set(Features::DEVICE_ID, def.device_id);
        f.set(Features::DUAL_IO, def.dual_io);
        f
    }
}

/// Single chip definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    family: FamilyDef,
    capacity: Size,
    #[serde(default)]
    features: FeaturesDef,
    #[serde(default)]
    device_id: Option<[u8; 4]>,
    #[serde(default = "default_speed")]
    speed_hz: u32,
    #[serde(default)]
    address_width: AddressWidth,
}

fn default_speed() -> u32 {
    DEFAULT_SPEED_HZ
}

/// Vendor definition containing multiple chips
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    chips: Vec<ChipDef>,
}

// ============================================================================
// Chip database
// ============================================================================

/// A named chip with its protocol profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamChip {
    /// Vendor name (e.g., "Fujitsu")
    pub vendor: String,
    /// Part name (e.g., "MB85RS64V")
    pub name: String,
    /// Expected RDID response, if the part has one
    pub device_id: Option<[u8; 4]>,
    /// Protocol profile
    pub profile: ChipProfile,
}

/// Runtime chip database
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    chips: Vec<RamChip>,
}

impl ChipDatabase {
    /// Create an empty chip database
    pub fn new() -> Self {
        Self { chips: Vec::new() }
    }

    /// Create a database holding the built-in chips
    pub fn with_builtin() -> Self {
        let chips = BUILTIN_CHIPS
            .iter()
            .map(|c| RamChip {
                vendor: c.vendor.into(),
                name: c.name.into(),
                device_id: c.device_id,
                profile: c.profile,
            })
            .collect();
        Self { chips }
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    ///
    /// A chip whose name is already known replaces the earlier entry.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        let vendor_def: VendorDef = ron::from_str(content)?;
        let count = vendor_def.chips.len();

        for chip_def in vendor_def.chips {
            let features: Features = chip_def.features.into();
            let capacity = chip_def.capacity.to_bytes().ok_or_else(|| {
                ChipDbError::Validation(alloc::format!(
                    "{}: capacity {:?} overflows 32 bits",
                    chip_def.name,
                    chip_def.capacity
                ))
            })?;
            let profile = ChipProfile {
                capacity,
                opcodes: chip_def.family.opcodes(),
                features,
                address_width: chip_def.address_width,
                max_speed_hz: chip_def.speed_hz,
                id_len: if features.contains(Features::DEVICE_ID) { 4 } else { 0 },
            };
            if profile.capacity == 0 || !profile.is_consistent() {
                return Err(ChipDbError::Validation(alloc::format!(
                    "{}: features do not match the {:?} opcode set or capacity",
                    chip_def.name,
                    chip_def.family
                )));
            }

            let chip = RamChip {
                vendor: vendor_def.vendor.clone(),
                name: chip_def.name,
                device_id: chip_def.device_id,
                profile,
            };
            log::debug!("chipdb: {} {} ({} bytes)", chip.vendor, chip.name, profile.capacity);
            self.chips.retain(|c| !c.name.eq_ignore_ascii_case(&chip.name));
            self.chips.push(chip);
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get all chips in the database
    pub fn chips(&self) -> &[RamChip] {
        &self.chips
    }

    /// Get the number of chips in the database
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Find a chip by exact name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&RamChip> {
        self.chips.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Find a chip by its RDID response
    pub fn find_by_device_id(&self, id: &[u8]) -> Option<&RamChip> {
        self.chips
            .iter()
            .find(|c| c.device_id.is_some_and(|d| d[..] == *id))
    }

    /// Find chips by vendor (case-insensitive partial match)
    pub fn find_by_vendor(&self, vendor: &str) -> Vec<&RamChip> {
        let vendor_lower = vendor.to_lowercase();
        self.chips
            .iter()
            .filter(|c| c.vendor.to_lowercase().contains(&vendor_lower))
            .collect()
    }

    /// Iterate over all chips
    pub fn iter(&self) -> impl Iterator<Item = &RamChip> {
        self.chips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let db = ChipDatabase::with_builtin();
        assert_eq!(db.len(), 2);
        let fram = db.find_by_name("mb85rs64v").unwrap();
        assert_eq!(fram.vendor, "Fujitsu");
        assert!(fram.profile.requires_write_latch());
        let by_id = db.find_by_device_id(&[0x04, 0x7F, 0x03, 0x02]).unwrap();
        assert_eq!(by_id.name, "MB85RS64V");
    }

    #[test]
    fn test_load_ron() {
        let ron = r#"
        (
            vendor: "Fujitsu",
            chips: [
                (
                    name: "MB85RS256B",
                    family: Fram,
                    capacity: KiB(32),
                    features: (
                        write_latch: true,
                        status_reg: true,
                        device_id: true,
                    ),
                    device_id: Some((0x04, 0x7F, 0x05, 0x09)),
                ),
            ],
        )
        "#;

        let mut db = ChipDatabase::new();
        let count = db.load_ron(ron).unwrap();

        assert_eq!(count, 1);
        let chip = db.find_by_name("MB85RS256B").unwrap();
        assert_eq!(chip.profile.capacity, 32 * 1024);
        assert_eq!(chip.profile.max_speed_hz, DEFAULT_SPEED_HZ);
        assert_eq!(chip.profile.id_len, 4);
        assert!(chip.profile.requires_write_latch());
        assert_eq!(chip.device_id, Some([0x04, 0x7F, 0x05, 0x09]));
    }

    #[test]
    fn test_load_ron_replaces_builtin() {
        let ron = r#"
        (
            vendor: "Microchip",
            chips: [
                (name: "23LCV512", family: Sram, capacity: KiB(64), speed_hz: 20000000,
                 features: (mode_reg: true)),
            ],
        )
        "#;

        let mut db = ChipDatabase::with_builtin();
        db.load_ron(ron).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.find_by_name("23LCV512").unwrap().profile.max_speed_hz, 20_000_000);
    }

    #[test]
    fn test_load_ron_rejects_inconsistent() {
        let ron = r#"
        (
            vendor: "Microchip",
            chips: [
                (name: "bogus", family: Sram, capacity: KiB(64),
                 features: (write_latch: true)),
            ],
        )
        "#;

        let mut db = ChipDatabase::new();
        assert!(matches!(db.load_ron(ron), Err(ChipDbError::Validation(_))));
    }

    #[test]
    fn test_load_ron_rejects_capacity_overflow() {
        let ron = r#"
        (
            vendor: "Fujitsu",
            chips: [
                (name: "huge", family: Fram, capacity: KiB(4194304),
                 features: (write_latch: true)),
            ],
        )
        "#;

        let mut db = ChipDatabase::new();
        assert!(matches!(
            db.load_ron(ron),
            Err(ChipDbError::Validation(ref s)) if s.contains("huge")
        ));
        assert!(db.is_empty());
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(256).to_bytes(), Some(256));
        assert_eq!(Size::KiB(8).to_bytes(), Some(8192));
        assert_eq!(Size::KiB(64).to_bytes(), Some(65536));
        assert_eq!(Size::KiB(4_194_303).to_bytes(), Some(0xFFFF_FC00));
        assert_eq!(Size::KiB(4_194_304).to_bytes(), None);
        assert_eq!(Size::KiB(u32::MAX).to_bytes(), None);
    }
}
