//! spiram - SPI FRAM/SRAM access tool
//!
//! Reads, writes and streams data to SPI serial RAM chips (FRAM such as the
//! Fujitsu MB85RS64V, SRAM such as the Microchip 23LCV512).
//!
//! # Architecture
//!
//! Every backend is opened into a `RamHandle`:
//! - **Bus backends** (dummy, linux_spi) - the host drives chip select and
//!   SPI transfers, and the protocol engine builds each transaction
//! - **Attribute backends** (sysfs) - a kernel driver owns the bus, we only
//!   write `addr`/`size`/`listen` and move bytes through `data`
//!
//! The same command implementations work with either kind.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use spiram_core::chip::ChipDatabase;
use spiram_device::open_ram;

use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Load chip database
    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} chip definitions", db.len());

    match cli.command {
        Commands::Read {
            backend,
            addr,
            length,
            output,
        } => {
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::read::run_read(d, addr, length, output.as_deref()))
        }
        Commands::Write {
            backend,
            addr,
            input,
            data,
        } => {
            let payload = match (input, data) {
                (Some(path), _) => commands::read_file(&path)?,
                (None, Some(text)) => text.into_bytes(),
                (None, None) => return Err("Either --input or --data is required".into()),
            };
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::write::run_write(d, addr, &payload))
        }
        Commands::Dump { backend, output } => {
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::read::run_dump(d, &output))
        }
        Commands::Load {
            backend,
            input,
            verify,
        } => {
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::write::run_load(d, &input, verify))
        }
        Commands::Listen { backend, state } => {
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::listen::run_listen(d, state))
        }
        Commands::Stream {
            backend,
            addr,
            input,
        } => {
            let mut handle = open_ram(&backend, &db)?;
            handle.with_device(|d| commands::listen::run_stream(d, addr, &input))
        }
        Commands::Info { backend } => {
            let mut handle = open_ram(&backend, &db)?;
            commands::info::print_chip_info(&mut handle);
            Ok(())
        }
        Commands::Status { backend } => {
            let mut handle = open_ram(&backend, &db)?;
            commands::info::run_status(&mut handle)
        }
        Commands::Attr {
            backend,
            name,
            value,
        } => {
            let mut handle = open_ram(&backend, &db)?;
            commands::attr::run_attr(&mut handle, &name, value.as_deref())
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(&db, vendor.as_deref());
            Ok(())
        }
    }
}

/// Load the chip database: built-in chips plus the specified path or
/// default locations
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn std::error::Error>> {
    let mut db = ChipDatabase::with_builtin();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        }
    } else {
        // Try default locations
        let default_paths = [
            PathBuf::from("chips/vendors"),
            PathBuf::from("/usr/share/spiram/chips"),
            PathBuf::from("/usr/local/share/spiram/chips"),
        ];

        for dir in &default_paths {
            if dir.is_dir() {
                match db.load_dir(dir) {
                    Ok(count) => {
                        log::debug!("Loaded {} chips from {}", count, dir.display());
                    }
                    Err(e) => {
                        log::warn!("Failed to load chips from {}: {}", dir.display(), e);
                    }
                }
            }
        }
    }

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_vendor_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("chips/vendors");
        let db = load_chip_database(Some(&dir)).unwrap();

        let fram = db.find_by_name("MB85RS256B").unwrap();
        assert_eq!(fram.profile.capacity, 32 * 1024);
        assert!(fram.profile.requires_write_latch());

        let sram = db.find_by_name("23K256").unwrap();
        assert!(!sram.profile.requires_write_latch());

        // Built-in parts survive and are not duplicated
        assert_eq!(
            db.iter().filter(|c| c.name == "MB85RS64V").count(),
            1
        );
    }

    #[test]
    fn test_missing_chip_db_path() {
        assert!(load_chip_database(Some(Path::new("/nonexistent/spiram"))).is_err());
    }
}
