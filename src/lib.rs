//! # tasklist
//!
//! Cross-platform process table snapshots. One call enumerates every live
//! process and returns a [`ProcessRecord`] per process, collecting only the
//! attributes named in a [`FieldSelector`]. Unrequested attributes cost no
//! system calls.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tasklist::{snapshot, Field, FieldSelector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fields = FieldSelector::none()
//!     .with(Field::Pid)
//!     .with(Field::Name)
//!     .with(Field::Cpu);
//!
//! for proc in snapshot(fields)? {
//!     println!("{:>7} {:5.1}% {}", proc.pid, proc.cpu, proc.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Field lists can also be parsed, and records projected down to the
//! requested keys:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fields: tasklist::FieldSelector = "pid,owner,pmem".parse()?;
//! let rows: Vec<_> = tasklist::snapshot(fields)?
//!     .iter()
//!     .map(|p| p.project(&fields))
//!     .collect();
//! println!("{}", serde_json::to_string_pretty(&rows)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `async` - [`snapshot_async`] on the tokio blocking pool
//! - `cli` - the `tasklist` command-line tool
//!
//! ## Platform Support
//!
//! | Platform | Enumeration | Identity | Owner | Timing | Memory |
//! |----------|-------------|----------|-------|--------|--------|
//! | Linux    | `/proc`     | ✅       | ✅    | ✅     | ✅     |
//! | Windows  | WMI         | ✅       | ✅    | ✅     | ✅     |
//! | Other    | ❌          | ❌       | ❌    | ❌     | ❌     |

pub mod config; // Configuration management with TOML persistence
pub mod error;
pub mod fields; // Field names and selection
pub mod metrics; // Unit conversions and CPU percentage
pub mod platform;
pub mod record;
pub mod snapshot; // Snapshot assembly over a process source
pub mod source;

pub use config::{Config, FieldsConfig, OutputConfig};
pub use error::{EnumerationError, Error, Result};
pub use fields::{Field, FieldSelector};
pub use record::ProcessRecord;
pub use snapshot::Assembler;
pub use source::ProcessSource;

/// Take one snapshot of the process table
///
/// Returns a record for every process with a known, non-zero pid. Fields not
/// set in `fields` hold their defaults; so do fields whose source was
/// unreadable (access denied, process exited mid-read). The only error is a
/// failure to list processes at all.
///
/// Blocking. Each call opens and releases its own OS resources.
pub fn snapshot(fields: FieldSelector) -> std::result::Result<Vec<ProcessRecord>, EnumerationError> {
    Assembler::new(platform::native_source()).run(&fields)
}

/// [`snapshot`] on the tokio blocking thread pool
#[cfg(feature = "async")]
pub async fn snapshot_async(
    fields: FieldSelector,
) -> std::result::Result<Vec<ProcessRecord>, EnumerationError> {
    tokio::task::spawn_blocking(move || snapshot(fields))
        .await
        .map_err(|e| EnumerationError::Worker(e.to_string()))?
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
