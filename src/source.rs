//! Process source abstraction
//!
//! A [`ProcessSource`] is one platform's view of the process table: it lists
//! process handles and answers attribute-group queries about each one. The
//! snapshot assembler only talks to this trait; the concrete backend is picked
//! at compile time in [`crate::platform`].
//!
//! Readers receive the [`FieldSelector`] so they can skip sources whose fields
//! were not requested. Group results use `Option` where the group spans several
//! independent OS sources, so one failed read does not blank its siblings.

use crate::error::EnumerationError;
use crate::fields::FieldSelector;
use std::io;
use thiserror::Error;

/// Failure to read one attribute group of one process
///
/// Never surfaces past the snapshot assembler: the affected fields keep their
/// defaults.
#[derive(Error, Debug)]
pub enum ReadError {
    /// Source file or handle could not be read
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel data did not have the expected layout
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// The OS refused or lacks the information
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Result type for attribute readers
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// ppid, name, path, cmdline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub ppid: Option<u32>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub cmdline: Option<String>,
}

/// threads, priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scheduling {
    pub threads: u32,
    pub priority: i32,
}

/// Normalized CPU time counters, all in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    /// Start time in Unix epoch ms
    pub start_time_ms: u64,
    /// Time since the process started
    pub elapsed_ms: u64,
    /// User-mode CPU time
    pub user_ms: u64,
    /// Kernel-mode CPU time
    pub kernel_ms: u64,
}

/// Memory sizes in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Memory {
    pub virtual_bytes: u64,
    pub resident_bytes: u64,
}

/// Platform process table
pub trait ProcessSource {
    /// Opaque per-process handle; dropping it releases any OS resources
    type Handle;

    /// List live processes. Failure here fails the whole snapshot.
    fn enumerate(&mut self, fields: &FieldSelector) -> Result<Vec<Self::Handle>, EnumerationError>;

    /// Process ID, or `None` when it cannot be established
    fn pid(&self, handle: &Self::Handle) -> Option<u32>;

    /// Read the identity fields requested in `fields`
    fn read_identity(&self, handle: &Self::Handle, fields: &FieldSelector) -> ReadResult<Identity>;

    /// Resolve the owning user name
    fn read_ownership(&self, handle: &Self::Handle) -> ReadResult<String>;

    /// Read thread count and priority
    fn read_scheduling(&self, handle: &Self::Handle) -> ReadResult<Scheduling>;

    /// Read start time and CPU time counters
    fn read_timing(&self, handle: &Self::Handle) -> ReadResult<Timing>;

    /// Read virtual and resident memory sizes
    fn read_memory(&self, handle: &Self::Handle) -> ReadResult<Memory>;
}
