//! Unified serial RAM access
//!
//! This crate hides the difference between driving the SPI bus directly
//! (a [`DeviceSession`](spiram_core::session::DeviceSession) over some host
//! transport) and going through a kernel driver's attribute files. The CLI
//! should only interact with types from this crate and the chip database.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (bin/spiram)                     │
//! │  - Only imports spiram-device and spiram-core (chip db)     │
//! │  - Never sees HostTransport or SysfsRam                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   spiram-device (this crate)                │
//! │  - RamHandle: chip info + backend + attributes              │
//! │  - Backend registry: opens backends by name                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │      spiram-core         │   │  Backend crates          │
//! │  - Protocol engine       │   │  - dummy, linux-spi      │
//! │  - DeviceSession         │   │    (HostTransport)       │
//! │  - RamDevice trait       │   │  - sysfs (RamDevice)     │
//! │  - Chip database         │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spiram_core::chip::ChipDatabase;
//! use spiram_device::open_ram;
//!
//! let db = ChipDatabase::with_builtin();
//! let mut handle = open_ram("dummy:chip=23LCV512", &db)?;
//!
//! handle.write(0x23, b"testinggg")?;
//! let mut buf = [0u8; 9];
//! handle.read(0x23, &mut buf)?;
//! ```

mod handle;
mod registry;

pub use handle::{AttributeDevice, BoxedTransport, ChipInfo, RamHandle};
pub use registry::{
    available_backends, backend_names_short, open_ram, parse_backend_params, BackendInfo,
    BackendParams,
};

// Re-export core types that CLI needs
pub use spiram_core::device::{RamDevice, RamDeviceExt};
