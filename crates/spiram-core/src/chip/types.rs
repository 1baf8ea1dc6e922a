//! RAM chip type definitions

use super::features::Features;
use crate::spi::{opcodes, AddressWidth};

/// Default SPI clock rate for both families (400 kHz)
pub const DEFAULT_SPEED_HZ: u32 = 400_000;

/// Word size on the bus; both families are byte oriented
pub const DATA_WIDTH_BITS: u8 = 8;

/// Opcodes understood by a chip
///
/// `read` and `write` are mandatory. Everything else is present only when
/// the matching [`Features`] flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeSet {
    /// Read memory
    pub read: u8,
    /// Write memory
    pub write: u8,
    /// Set write enable latch
    pub write_enable: Option<u8>,
    /// Reset write enable latch
    pub write_disable: Option<u8>,
    /// Read status (FRAM) or mode (SRAM) register
    pub read_register: Option<u8>,
    /// Write status (FRAM) or mode (SRAM) register
    pub write_register: Option<u8>,
    /// Read device ID
    pub read_id: Option<u8>,
    /// Enter dual I/O
    pub enter_dual_io: Option<u8>,
    /// Reset I/O mode back to single SPI
    pub reset_io: Option<u8>,
}

impl OpcodeSet {
    /// MB85RS family opcodes
    pub const FRAM: Self = Self {
        read: opcodes::READ,
        write: opcodes::WRITE,
        write_enable: Some(opcodes::WREN),
        write_disable: Some(opcodes::WRDI),
        read_register: Some(opcodes::RDSR),
        write_register: Some(opcodes::WRSR),
        read_id: Some(opcodes::RDID),
        enter_dual_io: None,
        reset_io: None,
    };

    /// 23LCV family opcodes
    pub const SRAM: Self = Self {
        read: opcodes::READ,
        write: opcodes::WRITE,
        write_enable: None,
        write_disable: None,
        read_register: Some(opcodes::RDMR),
        write_register: Some(opcodes::WRMR),
        read_id: None,
        enter_dual_io: Some(opcodes::EDIO),
        reset_io: Some(opcodes::RSTIO),
    };
}

/// Constant description of one RAM part
///
/// This is everything the protocol engine needs; it is `Copy` so every
/// session owns its own profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProfile {
    /// Capacity in bytes
    pub capacity: u32,
    /// Opcode set
    pub opcodes: OpcodeSet,
    /// Feature flags
    pub features: Features,
    /// Address width on the wire
    pub address_width: AddressWidth,
    /// Default SPI clock rate in Hz
    pub max_speed_hz: u32,
    /// Length of the RDID response in bytes (0 if unsupported)
    pub id_len: u8,
}

impl ChipProfile {
    /// Whether writes must be bracketed by WREN/WRDI
    pub fn requires_write_latch(&self) -> bool {
        self.features.contains(Features::WRITE_LATCH)
    }

    /// Check if an address is valid for a session pointer
    ///
    /// The pointer may sit one past the last byte, matching the range the
    /// attribute interface has always accepted.
    pub fn is_valid_address(&self, addr: u32) -> bool {
        addr <= self.capacity
    }

    /// Check if a transfer size is valid
    pub fn is_valid_size(&self, size: u32) -> bool {
        size >= 1 && size <= self.capacity
    }

    /// Check that every feature flag has the opcodes it needs
    pub fn is_consistent(&self) -> bool {
        let ops = &self.opcodes;
        let latch_ok = !self.requires_write_latch()
            || (ops.write_enable.is_some() && ops.write_disable.is_some());
        let reg = self.features.intersects(Features::STATUS_REG | Features::MODE_REG);
        let reg_ok = !reg || (ops.read_register.is_some() && ops.write_register.is_some());
        let id_ok = !self.features.contains(Features::DEVICE_ID)
            || (ops.read_id.is_some() && self.id_len > 0);
        let dual_ok = !self.features.contains(Features::DUAL_IO)
            || (ops.enter_dual_io.is_some() && ops.reset_io.is_some());
        latch_ok && reg_ok && id_ok && dual_ok && self.capacity <= self.address_width.max_size()
    }
}

/// Fujitsu MB85RS64V, 64 Kbit FRAM
pub const MB85RS64V: ChipProfile = ChipProfile {
    capacity: 8 * 1024,
    opcodes: OpcodeSet::FRAM,
    features: Features::WRITE_LATCH
        .union(Features::STATUS_REG)
        .union(Features::DEVICE_ID),
    address_width: AddressWidth::TwoByte,
    max_speed_hz: DEFAULT_SPEED_HZ,
    id_len: 4,
};

/// Microchip 23LCV512, 512 Kbit battery-backed SRAM
pub const M23LCV512: ChipProfile = ChipProfile {
    capacity: 64 * 1024,
    opcodes: OpcodeSet::SRAM,
    features: Features::MODE_REG.union(Features::DUAL_IO),
    address_width: AddressWidth::TwoByte,
    max_speed_hz: DEFAULT_SPEED_HZ,
    id_len: 0,
};

/// A named chip from the built-in table
#[derive(Debug, Clone, Copy)]
pub struct StaticChip {
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// Expected RDID response, if the part has one
    pub device_id: Option<[u8; 4]>,
    /// Protocol profile
    pub profile: ChipProfile,
}

/// Chips known without any database file
pub const BUILTIN_CHIPS: &[StaticChip] = &[
    StaticChip {
        vendor: "Fujitsu",
        name: "MB85RS64V",
        device_id: Some([0x04, 0x7F, 0x03, 0x02]),
        profile: MB85RS64V,
    },
    StaticChip {
        vendor: "Microchip",
        name: "23LCV512",
        device_id: None,
        profile: M23LCV512,
    },
];

/// Find a built-in chip by name (case-insensitive)
pub fn find_builtin(name: &str) -> Option<&'static StaticChip> {
    BUILTIN_CHIPS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}
