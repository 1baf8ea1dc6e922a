//! Info and status commands

use spiram_core::spi::{MR_BYTE, MR_MODE_MASK, MR_PAGE, MR_SEQUENTIAL};
use spiram_core::spi::{SR_BP0, SR_BP1, SR_WEL, SR_WPEN};
use spiram_device::RamHandle;

/// Print chip information
pub fn print_chip_info(handle: &mut RamHandle) {
    let info = handle.chip_info().clone();

    println!("Chip Information");
    println!("================");
    println!();
    println!("Vendor:          {}", info.vendor);
    println!("Name:            {}", info.name);
    println!(
        "Size:            {} bytes ({} KiB)",
        info.capacity,
        info.capacity / 1024
    );
    println!(
        "Type:            {}",
        if info.write_latch {
            "FRAM (WREN/WRDI around writes)"
        } else {
            "SRAM (no write latch)"
        }
    );
    println!(
        "Listen mode:     {}",
        if handle.is_listening() { "on" } else { "off" }
    );

    if let Some(expected) = info.device_id {
        match handle.read_device_id() {
            Ok(id) => {
                println!("Device ID:       {}", format_id(&id));
                if id != expected {
                    println!("                 (expected {})", format_id(&expected));
                }
            }
            Err(e) => log::warn!("Could not read device ID: {}", e),
        }
    }
}

fn format_id(id: &[u8]) -> String {
    id.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run the status command
pub fn run_status(handle: &mut RamHandle) -> Result<(), Box<dyn std::error::Error>> {
    let value = handle.read_register()?;
    if handle.chip_info().write_latch {
        println!("Status register: 0x{:02X}", value);
        for line in describe_status(value) {
            println!("  {}", line);
        }
    } else {
        println!("Mode register:   0x{:02X}", value);
        println!("  {}", describe_mode(value));
    }
    Ok(())
}

/// Decode an FRAM status register
pub fn describe_status(value: u8) -> Vec<String> {
    let bp = (value & (SR_BP0 | SR_BP1)) >> SR_BP0.trailing_zeros();
    let protected = match bp {
        0 => "none",
        1 => "upper quarter",
        2 => "upper half",
        _ => "all",
    };
    vec![
        format!("WEL  (write enable latch): {}", value & SR_WEL != 0),
        format!("BP   (block protect):      {} ({})", bp, protected),
        format!("WPEN (status protect):     {}", value & SR_WPEN != 0),
    ]
}

/// Decode an SRAM mode register
pub fn describe_mode(value: u8) -> &'static str {
    match value & MR_MODE_MASK {
        MR_BYTE => "Byte mode",
        MR_PAGE => "Page mode",
        MR_SEQUENTIAL => "Sequential mode",
        _ => "Reserved mode",
    }
}
