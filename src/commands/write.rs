//! Write and load commands

use super::read::read_with_progress;
use super::{check_fits, progress_bar, read_file, CHUNK_SIZE};
use spiram_core::device::RamDevice;
use std::path::Path;

/// Run the write command
pub fn run_write<D: RamDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    check_fits(addr, data.len(), device.capacity())?;
    device.write(addr, data)?;
    println!("Wrote {} bytes at 0x{:X}", data.len(), addr);
    Ok(())
}

/// Run the load command (file to chip, starting at address 0)
pub fn run_load<D: RamDevice + ?Sized>(
    device: &mut D,
    input: &Path,
    do_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = read_file(input)?;
    load_image(device, &image, do_verify)
}

/// Write `image` from address 0 in chunks, optionally reading it back
pub fn load_image<D: RamDevice + ?Sized>(
    device: &mut D,
    image: &[u8],
    do_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let capacity = device.capacity();
    if image.len() > capacity as usize {
        return Err(format!(
            "File size ({} bytes) exceeds chip size ({} bytes)",
            image.len(),
            capacity
        )
        .into());
    }
    if image.len() < capacity as usize {
        println!(
            "Note: File ({} bytes) is smaller than the chip ({} bytes)",
            image.len(),
            capacity
        );
    }

    let pb = progress_bar(image.len() as u64, "Writing")?;
    let mut offset = 0usize;
    for chunk in image.chunks(CHUNK_SIZE) {
        device.write(offset as u32, chunk)?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }
    pb.finish_with_message("Write complete");

    if do_verify {
        verify(device, image)?;
    }

    println!("Load complete! ({} bytes written)", image.len());
    Ok(())
}

/// Read the chip back and compare against `image`
fn verify<D: RamDevice + ?Sized>(
    device: &mut D,
    image: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = read_with_progress(device, "Verifying")?;
    if let Some(pos) = contents
        .iter()
        .zip(image)
        .position(|(have, want)| have != want)
    {
        return Err(format!(
            "Verification failed at 0x{:X}: expected 0x{:02X}, got 0x{:02X}",
            pos, image[pos], contents[pos]
        )
        .into());
    }
    println!("Verification passed");
    Ok(())
}
