//! Error types for tasklist

use std::io;
use thiserror::Error;

/// Result type alias for tasklist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to list the process table at all.
///
/// This is the only error [`crate::snapshot()`] ever returns. Problems with a
/// single process or a single field are absorbed and never surface here.
#[derive(Error, Debug)]
pub enum EnumerationError {
    /// The process directory could not be read
    #[error("Failed to read process directory {path}: {source}")]
    ProcDirectory {
        /// Directory that was being listed
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// COM could not be initialized or the WMI session could not be opened
    #[cfg(windows)]
    #[error("WMI session failed: {0}")]
    Session(#[source] wmi::WMIError),

    /// The `Win32_Process` query failed
    #[cfg(windows)]
    #[error("Process query failed: {0}")]
    Query(#[source] wmi::WMIError),

    /// No backend exists for the target OS
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The blocking worker running the snapshot went away
    #[error("Snapshot worker failed: {0}")]
    Worker(String),
}

/// Main error type for tasklist
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Process table could not be listed
    #[error("Enumeration error: {0}")]
    Enumeration(#[from] EnumerationError),

    /// Unknown field name in a selector
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
