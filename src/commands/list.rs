//! List commands implementation

use spiram_core::chip::ChipDatabase;

/// List all backends compiled into this build
pub fn list_backends() {
    println!("Supported backends:");
    println!();
    for backend in spiram_device::available_backends() {
        println!("  {:<10} - {}", backend.name, backend.description);
        if !backend.aliases.is_empty() {
            println!("  {:<10}   (aliases: {})", "", backend.aliases.join(", "));
        }
    }
}

/// List all chips in the database
pub fn list_chips(db: &ChipDatabase, vendor_filter: Option<&str>) {
    println!("Supported chips:");
    println!();
    println!(
        "{:<12} {:<14} {:>8} {:>6} {:>12}",
        "Vendor", "Name", "Size", "Type", "Device ID"
    );
    println!("{}", "-".repeat(56));

    let chips = match vendor_filter {
        Some(vendor) => db.find_by_vendor(vendor),
        None => db.iter().collect(),
    };

    for chip in chips {
        let id_str = chip
            .device_id
            .map(|id| format!("{:02X}{:02X}{:02X}{:02X}", id[0], id[1], id[2], id[3]))
            .unwrap_or_else(|| "-".to_string());
        let kind = if chip.profile.requires_write_latch() {
            "FRAM"
        } else {
            "SRAM"
        };

        println!(
            "{:<12} {:<14} {:>8} {:>6} {:>12}",
            chip.vendor,
            chip.name,
            format_size(chip.profile.capacity),
            kind,
            id_str
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
