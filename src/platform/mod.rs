//! Platform-specific implementations
//!
//! Exactly one [`NativeSource`] exists per target OS; the choice is made at
//! compile time.

use crate::error::EnumerationError;
use crate::fields::FieldSelector;
use crate::source::{Identity, Memory, ProcessSource, ReadError, ReadResult, Scheduling, Timing};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(windows)]
pub mod windows;

// Common utilities
#[cfg(target_os = "linux")]
pub mod common;

/// Process source for the compilation target
#[cfg(target_os = "linux")]
pub type NativeSource = linux::ProcSource;

/// Process source for the compilation target
#[cfg(windows)]
pub type NativeSource = windows::WmiSource;

/// Process source for the compilation target
#[cfg(not(any(target_os = "linux", windows)))]
pub type NativeSource = UnsupportedSource;

/// Fresh native source for one snapshot
pub fn native_source() -> NativeSource {
    NativeSource::default()
}

/// Stand-in for targets without a backend; enumeration always fails
#[derive(Debug, Default)]
pub struct UnsupportedSource;

impl ProcessSource for UnsupportedSource {
    type Handle = ();

    fn enumerate(&mut self, _fields: &FieldSelector) -> Result<Vec<()>, EnumerationError> {
        Err(EnumerationError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }

    fn pid(&self, _handle: &()) -> Option<u32> {
        None
    }

    fn read_identity(&self, _handle: &(), _fields: &FieldSelector) -> ReadResult<Identity> {
        Err(unsupported())
    }

    fn read_ownership(&self, _handle: &()) -> ReadResult<String> {
        Err(unsupported())
    }

    fn read_scheduling(&self, _handle: &()) -> ReadResult<Scheduling> {
        Err(unsupported())
    }

    fn read_timing(&self, _handle: &()) -> ReadResult<Timing> {
        Err(unsupported())
    }

    fn read_memory(&self, _handle: &()) -> ReadResult<Memory> {
        Err(unsupported())
    }
}

fn unsupported() -> ReadError {
    ReadError::Unavailable(format!("no process backend for {}", std::env::consts::OS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_source_fails_enumeration() {
        let mut source = UnsupportedSource;
        let err = source.enumerate(&FieldSelector::all()).unwrap_err();
        assert!(matches!(err, EnumerationError::UnsupportedPlatform(_)));
    }
}
