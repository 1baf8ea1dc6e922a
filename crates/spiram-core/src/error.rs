//! Error types for spiram-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bus or the chip-select line failed
    Transport,
    /// An address, size or buffer was out of bounds
    Range,
    /// The operation is not valid in the session's current state
    InvalidState,
    /// Anything else
    Other,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// SPI transfer reported a failure
    Transport,
    /// Chip-select line could not be driven
    ChipSelect,

    // Range errors
    /// Address is beyond the chip capacity
    AddressOutOfRange {
        /// Requested address
        addr: u32,
        /// Chip capacity in bytes
        capacity: u32,
    },
    /// Transfer size is zero or beyond the chip capacity
    SizeOutOfRange {
        /// Requested size
        size: u32,
        /// Chip capacity in bytes
        capacity: u32,
    },
    /// Provided buffer is too small for the operation
    BufferTooSmall,

    // State errors
    /// Operation not allowed in the current listen state
    InvalidState,
    /// A read was requested before a transfer size was set
    SizeNotSet,

    // Other errors
    /// Opcode is not part of the chip's opcode set
    OpcodeNotSupported,
    /// Attribute input could not be parsed
    Parse,
    /// No attribute with the requested name
    UnknownAttribute,
    /// I/O error in a file-backed device
    Io,
    /// No chip profile with the requested name
    ChipNotFound,
}

impl Error {
    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport | Self::ChipSelect => ErrorKind::Transport,
            Self::AddressOutOfRange { .. } | Self::SizeOutOfRange { .. } | Self::BufferTooSmall => {
                ErrorKind::Range
            }
            Self::InvalidState | Self::SizeNotSet => ErrorKind::InvalidState,
            Self::OpcodeNotSupported
            | Self::Parse
            | Self::UnknownAttribute
            | Self::Io
            | Self::ChipNotFound => ErrorKind::Other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "SPI transfer failed"),
            Self::ChipSelect => write!(f, "failed to drive chip select"),
            Self::AddressOutOfRange { addr, capacity } => write!(
                f,
                "address 0x{:X} out of range (capacity {} bytes)",
                addr, capacity
            ),
            Self::SizeOutOfRange { size, capacity } => write!(
                f,
                "transfer size {} out of range (1..={})",
                size, capacity
            ),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::InvalidState => write!(f, "operation not allowed in current listen state"),
            Self::SizeNotSet => write!(f, "transfer size not set"),
            Self::OpcodeNotSupported => write!(f, "opcode not supported by chip"),
            Self::Parse => write!(f, "invalid attribute value"),
            Self::UnknownAttribute => write!(f, "unknown attribute"),
            Self::Io => write!(f, "I/O error"),
            Self::ChipNotFound => write!(f, "chip not found"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
