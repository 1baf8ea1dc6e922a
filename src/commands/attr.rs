//! Attribute command

use super::read::hex_dump;
use spiram_device::RamHandle;

/// Run the attr command: store `value` into `name`, or show `name`
pub fn run_attr(
    handle: &mut RamHandle,
    name: &str,
    value: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(value) = value {
        let consumed = handle.store_attribute(name, value.as_bytes())?;
        println!("{}: stored {} bytes", name, consumed);
        return Ok(());
    }

    let shown = handle.show_attribute(name)?;
    if name == "data" {
        let addr = current_address(handle);
        print!("{}", hex_dump(addr, &shown));
    } else {
        print!("{}", String::from_utf8_lossy(&shown));
    }
    Ok(())
}

/// Address the `addr` attribute currently reports (0 if unreadable)
fn current_address(handle: &mut RamHandle) -> u32 {
    handle
        .show_attribute("addr")
        .ok()
        .and_then(|text| {
            let text = String::from_utf8_lossy(&text).trim().to_string();
            let digits = text.strip_prefix("0x").unwrap_or(&text).to_string();
            u32::from_str_radix(&digits, 16).ok()
        })
        .unwrap_or(0)
}
