//! CLI command implementations
//!
//! Data commands work on any `RamDevice`, whether the bus is driven directly
//! through a session or the chip sits behind driver attribute files. Commands
//! that need the attribute surface or chip information take the whole
//! `RamHandle`.

pub mod attr;
pub mod info;
mod list;
pub mod listen;
pub mod read;
pub mod write;

pub use list::{list_backends, list_chips};

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Chunk size for whole-chip transfers (4 KiB)
pub const CHUNK_SIZE: usize = 4096;

/// Create a progress bar with a phase message
pub fn progress_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Read file contents into a Vec
pub fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Check that `len` bytes at `addr` fit in a chip of `capacity` bytes
pub fn check_fits(addr: u32, len: usize, capacity: u32) -> Result<(), Box<dyn std::error::Error>> {
    if addr as u64 + len as u64 > capacity as u64 {
        return Err(format!(
            "{} bytes at 0x{:X} exceed chip size ({} bytes)",
            len, addr, capacity
        )
        .into());
    }
    Ok(())
}
