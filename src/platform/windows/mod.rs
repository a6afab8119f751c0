//! Windows process source: WMI for the table, Win32 handles for path and owner

pub mod handle;
pub mod process;
pub mod query;

pub use process::{WmiProcess, WmiSource};
