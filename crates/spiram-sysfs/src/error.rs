//! Error types for attribute file access

use std::path::PathBuf;

use thiserror::Error;

/// Sysfs wrapper errors
#[derive(Debug, Error)]
pub enum SysfsError {
    /// Reading or writing an attribute file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The device directory lacks an attribute file
    #[error("Attribute '{name}' not found in {dir}")]
    MissingAttribute { name: &'static str, dir: PathBuf },

    /// No attribute with that name
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// An attribute file held something unexpected
    #[error("Cannot parse {name} value '{value}'")]
    Parse { name: &'static str, value: String },

    /// The data file returned fewer bytes than requested
    #[error("Short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
}

/// Result type for sysfs operations
pub type Result<T> = std::result::Result<T, SysfsError>;
