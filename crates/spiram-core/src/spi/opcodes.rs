//! SPI serial RAM opcodes
//!
//! The FRAM (MB85RS) and SRAM (23LCV) families share the memory access
//! opcodes; the register opcodes overlap in value but not in meaning, so
//! they are listed per family.

// ============================================================================
// Memory access (both families)
// ============================================================================

/// Read memory, starting at the addressed byte
pub const READ: u8 = 0x03;
/// Write memory, starting at the addressed byte
pub const WRITE: u8 = 0x02;

// ============================================================================
// FRAM (MB85RS)
// ============================================================================

/// Set the write enable latch
pub const WREN: u8 = 0x06;
/// Reset the write enable latch
pub const WRDI: u8 = 0x04;
/// Read status register
pub const RDSR: u8 = 0x05;
/// Write status register
pub const WRSR: u8 = 0x01;
/// Read device ID
pub const RDID: u8 = 0x9F;

// ============================================================================
// SRAM (23LCV)
// ============================================================================

/// Read mode register
pub const RDMR: u8 = 0x05;
/// Write mode register
pub const WRMR: u8 = 0x01;
/// Enter dual I/O access
pub const EDIO: u8 = 0x3B;
/// Reset dual I/O access
pub const RSTIO: u8 = 0xFF;

// ============================================================================
// Register bit definitions
// ============================================================================

/// FRAM status: write enable latch
pub const SR_WEL: u8 = 0x02;
/// FRAM status: block protect bit 0
pub const SR_BP0: u8 = 0x04;
/// FRAM status: block protect bit 1
pub const SR_BP1: u8 = 0x08;
/// FRAM status: status register write protect enable
pub const SR_WPEN: u8 = 0x80;

/// SRAM mode register: operating mode field mask
pub const MR_MODE_MASK: u8 = 0xC0;
/// SRAM mode register: byte mode
pub const MR_BYTE: u8 = 0x00;
/// SRAM mode register: page mode
pub const MR_PAGE: u8 = 0x80;
/// SRAM mode register: sequential mode (power-on default)
pub const MR_SEQUENTIAL: u8 = 0x40;
