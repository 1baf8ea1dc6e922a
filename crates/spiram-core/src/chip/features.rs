//! RAM chip feature flags

use bitflags::bitflags;

bitflags! {
    /// Feature flags for serial RAM chips
    ///
    /// These flags describe what capabilities and behaviors a chip has.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// Writes must be bracketed by WREN/WRDI (FRAM)
        const WRITE_LATCH = 1 << 0;
        /// Has a status register (RDSR/WRSR)
        const STATUS_REG  = 1 << 1;
        /// Has a mode register (RDMR/WRMR)
        const MODE_REG    = 1 << 2;
        /// Answers RDID with a device ID
        const DEVICE_ID   = 1 << 3;
        /// Supports dual I/O access (EDIO/RSTIO)
        const DUAL_IO     = 1 << 4;
    }
}

impl Default for Features {
    fn default() -> Self {
        Features::empty()
    }
}
