//! Address width types

/// Address width for SPI frames
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum AddressWidth {
    /// No address phase
    None,
    /// 2-byte (16-bit) address - supports up to 64 KiB
    #[default]
    TwoByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::None => 0,
            Self::TwoByte => 2,
        }
    }

    /// Returns the maximum addressable size in bytes
    pub const fn max_size(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::TwoByte => 64 * 1024,
        }
    }

    /// Encode an address big-endian into `buf`
    ///
    /// Bits above the width are dropped; the chips wrap the same way.
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        match self {
            Self::None => {}
            Self::TwoByte => {
                buf[0] = (address >> 8) as u8;
                buf[1] = address as u8;
            }
        }
    }
}
