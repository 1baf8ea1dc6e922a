//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use [available: {}]",
        spiram_device::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spiram")]
#[command(author, version, about = "SPI FRAM/SRAM access tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to chip database directory or file (.ron)
    /// Defaults to looking in ./chips/vendors/ and /usr/share/spiram/chips/
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Listen mode switch
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenState {
    /// Hold chip select and accept streamed data
    On,
    /// Release chip select
    Off,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read bytes and print a hex dump (or save them to a file)
    Read {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Start address (hex, e.g., 0x23)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of bytes to read
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write bytes at an address
    Write {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Start address (hex, e.g., 0x23)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Input file path
        #[arg(short, long, conflicts_with = "data", required_unless_present = "data")]
        input: Option<PathBuf>,

        /// Literal text to write
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Read the whole chip to a file
    Dump {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a file to the chip starting at address 0
    Load {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Verify after writing
        #[arg(long, default_value = "true")]
        verify: bool,
    },

    /// Enter or leave listen mode
    Listen {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// New state
        #[arg(value_enum)]
        state: ListenState,
    },

    /// Stream a file through listen mode starting at an address
    Stream {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Start address (hex, e.g., 0x100)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show chip information
    Info {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,
    },

    /// Show the status (FRAM) or mode (SRAM) register
    Status {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,
    },

    /// Show or store a control attribute (addr, size, listen, data)
    Attr {
        /// Backend to use
        #[arg(short = 'p', long, help = backend_help())]
        backend: String,

        /// Attribute name
        name: String,

        /// Value to store; the attribute is shown when omitted
        value: Option<String>,
    },

    /// List supported backends
    ListBackends,

    /// List supported chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x23"), Ok(0x23));
        assert_eq!(parse_hex_u32("0X1F"), Ok(0x1F));
        assert_eq!(parse_hex_u32("35"), Ok(35));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_write_needs_input_or_data() {
        let parsed = Cli::try_parse_from(["spiram", "write", "-p", "dummy", "-a", "0x23"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "spiram", "write", "-p", "dummy", "-a", "0x23", "-d", "testinggg",
        ])
        .unwrap();
        match parsed.command {
            Commands::Write { addr, data, .. } => {
                assert_eq!(addr, 0x23);
                assert_eq!(data.as_deref(), Some("testinggg"));
            }
            _ => panic!("expected write"),
        }
    }

    #[test]
    fn test_listen_state() {
        let parsed = Cli::try_parse_from(["spiram", "-vv", "listen", "-p", "dummy", "on"]).unwrap();
        assert_eq!(parsed.verbose, 2);
        assert!(matches!(
            parsed.command,
            Commands::Listen {
                state: ListenState::On,
                ..
            }
        ));
    }
}
