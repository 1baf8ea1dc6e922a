//! Read and dump commands

use super::{check_fits, progress_bar, CHUNK_SIZE};
use spiram_core::device::RamDevice;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEX_DUMP_WIDTH: usize = 16;

/// Run the read command
///
/// Prints a hex dump unless an output file is given.
pub fn run_read<D: RamDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    length: u32,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    check_fits(addr, length as usize, device.capacity())?;

    let mut data = vec![0u8; length as usize];
    device.read(addr, &mut data)?;

    match output {
        Some(path) => {
            File::create(path)?.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => print!("{}", hex_dump(addr, &data)),
    }
    Ok(())
}

/// Run the dump command (whole chip to a file)
pub fn run_dump<D: RamDevice + ?Sized>(
    device: &mut D,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_with_progress(device, "Reading")?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Read the whole chip in chunks with a progress bar
pub fn read_with_progress<D: RamDevice + ?Sized>(
    device: &mut D,
    phase: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let total_size = device.capacity() as usize;
    let mut data = vec![0u8; total_size];

    let pb = progress_bar(total_size as u64, phase)?;

    let mut offset = 0usize;
    for chunk in data.chunks_mut(CHUNK_SIZE) {
        device.read(offset as u32, chunk)?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}

/// Format bytes as a hex dump with addresses and an ASCII column
pub fn hex_dump(addr: u32, data: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in data.chunks(HEX_DUMP_WIDTH).enumerate() {
        let _ = write!(out, "{:08x}: ", addr as usize + i * HEX_DUMP_WIDTH);
        for col in 0..HEX_DUMP_WIDTH {
            match line.get(col) {
                Some(b) => {
                    let _ = write!(out, "{:02x} ", b);
                }
                None => out.push_str("   "),
            }
        }
        out.push('|');
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}
