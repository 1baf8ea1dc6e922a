//! Listen mode commands

use super::{check_fits, progress_bar, read_file, CHUNK_SIZE};
use crate::cli::ListenState;
use spiram_core::device::RamDevice;
use std::path::Path;

/// Run the listen command
pub fn run_listen<D: RamDevice + ?Sized>(
    device: &mut D,
    state: ListenState,
) -> Result<(), Box<dyn std::error::Error>> {
    let on = state == ListenState::On;
    if device.set_listen(on)? {
        println!("Listen mode {}", if on { "entered" } else { "left" });
    } else {
        println!("Listen mode already {}", if on { "on" } else { "off" });
    }
    Ok(())
}

/// Run the stream command
pub fn run_stream<D: RamDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_file(input)?;
    stream_at(device, addr, &data)
}

/// Enter listen mode at `addr`, stream `data` and leave listen mode
///
/// Listen mode is left even when streaming fails; the streaming error is
/// the one reported.
pub fn stream_at<D: RamDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    check_fits(addr, data.len(), device.capacity())?;
    if device.is_listening() {
        return Err("Device is already listening; leave listen mode first".into());
    }

    device.seek(addr)?;
    device.set_listen(true)?;

    let result = stream_chunks(device, data);
    let exit = device.set_listen(false);
    result?;
    exit?;

    println!("Streamed {} bytes at 0x{:X}", data.len(), addr);
    Ok(())
}

fn stream_chunks<D: RamDevice + ?Sized>(
    device: &mut D,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = progress_bar(data.len() as u64, "Streaming")?;
    let mut offset = 0usize;
    for chunk in data.chunks(CHUNK_SIZE) {
        device.stream(chunk)?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }
    pb.finish_with_message("Stream complete");
    Ok(())
}
