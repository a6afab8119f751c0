//! Field selection
//!
//! A [`FieldSelector`] names the [`ProcessRecord`](crate::ProcessRecord)
//! attributes a caller wants. Every backend consults it before touching the
//! OS: an unset flag means the matching system call is never made and the
//! field keeps its zero/empty default.
//!
//! ```
//! use tasklist::{Field, FieldSelector};
//!
//! let fields: FieldSelector = "pid,name,cpu".parse().unwrap();
//! assert!(fields.is_set(Field::Cpu));
//! assert!(!fields.is_set(Field::Owner));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One collectible process attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Process identifier
    Pid,
    /// Parent process identifier
    Ppid,
    /// Executable basename
    Name,
    /// Absolute executable path
    Path,
    /// Full command line
    Cmdline,
    /// Owning user name
    Owner,
    /// Thread count
    Threads,
    /// OS-specific priority
    Priority,
    /// Start time (Unix epoch ms)
    Starttime,
    /// Virtual memory size (bytes)
    Vmem,
    /// Resident set size (bytes)
    Pmem,
    /// CPU usage since start (percent)
    Cpu,
    /// User-mode CPU time (ms)
    Utime,
    /// Kernel-mode CPU time (ms)
    Stime,
}

impl Field {
    /// Every field, in canonical output order
    pub const ALL: [Field; 14] = [
        Field::Pid,
        Field::Ppid,
        Field::Name,
        Field::Path,
        Field::Cmdline,
        Field::Owner,
        Field::Threads,
        Field::Priority,
        Field::Starttime,
        Field::Vmem,
        Field::Pmem,
        Field::Cpu,
        Field::Utime,
        Field::Stime,
    ];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Field::Pid => "pid",
            Field::Ppid => "ppid",
            Field::Name => "name",
            Field::Path => "path",
            Field::Cmdline => "cmdline",
            Field::Owner => "owner",
            Field::Threads => "threads",
            Field::Priority => "priority",
            Field::Starttime => "starttime",
            Field::Vmem => "vmem",
            Field::Pmem => "pmem",
            Field::Cpu => "cpu",
            Field::Utime => "utime",
            Field::Stime => "stime",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidField(wanted.to_string()))
    }
}

/// Mask of requested process attributes
///
/// Every combination is valid, including all-false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelector {
    pub pid: bool,
    pub ppid: bool,
    pub name: bool,
    pub path: bool,
    pub cmdline: bool,
    pub owner: bool,
    pub threads: bool,
    pub priority: bool,
    pub starttime: bool,
    pub vmem: bool,
    pub pmem: bool,
    pub cpu: bool,
    pub utime: bool,
    pub stime: bool,
}

impl FieldSelector {
    /// Selector with nothing requested
    pub fn none() -> Self {
        Self::default()
    }

    /// Selector with every field requested
    pub fn all() -> Self {
        Field::ALL
            .iter()
            .fold(Self::none(), |sel, &field| sel.with(field))
    }

    /// Build a selector from field names such as `["pid", "name"]`
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sel = Self::none();
        for name in names {
            let field: Field = name.as_ref().parse()?;
            sel.set(field, true);
        }
        Ok(sel)
    }

    /// Return a copy with `field` requested
    pub fn with(mut self, field: Field) -> Self {
        self.set(field, true);
        self
    }

    /// Set or clear a single flag
    pub fn set(&mut self, field: Field, on: bool) {
        *self.flag_mut(field) = on;
    }

    /// Whether `field` is requested
    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Pid => self.pid,
            Field::Ppid => self.ppid,
            Field::Name => self.name,
            Field::Path => self.path,
            Field::Cmdline => self.cmdline,
            Field::Owner => self.owner,
            Field::Threads => self.threads,
            Field::Priority => self.priority,
            Field::Starttime => self.starttime,
            Field::Vmem => self.vmem,
            Field::Pmem => self.pmem,
            Field::Cpu => self.cpu,
            Field::Utime => self.utime,
            Field::Stime => self.stime,
        }
    }

    /// Requested fields in canonical order
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(move |f| self.is_set(*f))
    }

    /// True when no field is requested
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    // Reader groups. A group is read when any of its fields is requested.

    /// ppid, name, path or cmdline
    pub fn wants_identity(&self) -> bool {
        self.ppid || self.name || self.path || self.cmdline
    }

    /// threads or priority
    pub fn wants_scheduling(&self) -> bool {
        self.threads || self.priority
    }

    /// starttime, utime, stime, or cpu (which is derived from them)
    pub fn wants_timing(&self) -> bool {
        self.starttime || self.utime || self.stime || self.cpu
    }

    /// vmem or pmem
    pub fn wants_memory(&self) -> bool {
        self.vmem || self.pmem
    }

    fn flag_mut(&mut self, field: Field) -> &mut bool {
        match field {
            Field::Pid => &mut self.pid,
            Field::Ppid => &mut self.ppid,
            Field::Name => &mut self.name,
            Field::Path => &mut self.path,
            Field::Cmdline => &mut self.cmdline,
            Field::Owner => &mut self.owner,
            Field::Threads => &mut self.threads,
            Field::Priority => &mut self.priority,
            Field::Starttime => &mut self.starttime,
            Field::Vmem => &mut self.vmem,
            Field::Pmem => &mut self.pmem,
            Field::Cpu => &mut self.cpu,
            Field::Utime => &mut self.utime,
            Field::Stime => &mut self.stime,
        }
    }
}

impl FromStr for FieldSelector {
    type Err = Error;

    /// Parse a comma-separated list; `all` selects everything
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        Self::from_names(s.split(',').map(str::trim).filter(|n| !n.is_empty()))
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().map(Field::name).collect();
        f.write_str(&names.join(","))
    }
}
