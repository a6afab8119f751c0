//! Linux platform implementation

pub mod process;
pub mod stat;
pub mod sys;

pub use process::{ProcEntry, ProcSource};
