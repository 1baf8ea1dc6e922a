//! SPI command frame
//!
//! A frame is the opcode byte followed by 0-2 big-endian address bytes.
//! It is built on the stack right before the transaction that sends it.

use heapless::Vec;

use super::AddressWidth;

/// Maximum frame length: opcode + 2 address bytes
pub const MAX_FRAME_LEN: usize = 3;

/// Opcode plus optional address, ready to go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiFrame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl SpiFrame {
    /// Frame with no address phase (e.g., WREN, WRDI, RDSR)
    pub fn command(opcode: u8) -> Self {
        let mut bytes = Vec::new();
        // Capacity is never exceeded: one byte into a three byte buffer
        let _ = bytes.push(opcode);
        Self { bytes }
    }

    /// Frame with an address phase (e.g., READ, WRITE)
    pub fn addressed(opcode: u8, address: u32, width: AddressWidth) -> Self {
        let mut frame = Self::command(opcode);
        let mut addr = [0u8; MAX_FRAME_LEN - 1];
        let n = width.bytes();
        width.encode(address, &mut addr);
        let _ = frame.bytes.extend_from_slice(&addr[..n]);
        frame
    }

    /// The opcode byte
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// The encoded frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the frame
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, a frame carries at least an opcode
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Frame followed by `payload`, for single-transfer writes
    pub fn with_payload(&self, payload: &[u8]) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec::Vec::with_capacity(self.len() + payload.len());
        out.extend_from_slice(self.as_bytes());
        out.extend_from_slice(payload);
        out
    }
}
