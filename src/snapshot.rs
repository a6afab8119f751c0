//! Snapshot assembly
//!
//! Drives a [`ProcessSource`]: enumerate once, then for each handle call only
//! the readers whose fields were requested and fold the results into a
//! [`ProcessRecord`].
//!
//! Failure policy is two-tier. Enumeration failure aborts the call with no
//! partial result. Everything after that is best effort: a reader that fails
//! leaves its fields at their defaults, and a handle whose pid cannot be
//! established is dropped from the result.

use crate::error::EnumerationError;
use crate::fields::FieldSelector;
use crate::metrics;
use crate::record::ProcessRecord;
use crate::source::{ProcessSource, ReadResult};
use log::{debug, trace};

/// Builds one snapshot from a process source
pub struct Assembler<S> {
    source: S,
}

impl<S: ProcessSource> Assembler<S> {
    /// Wrap a process source
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Enumerate and read every process
    ///
    /// Consumes the assembler so that the source, and every OS resource it
    /// holds, is released when this returns.
    pub fn run(mut self, fields: &FieldSelector) -> Result<Vec<ProcessRecord>, EnumerationError> {
        debug!("snapshot: enumerating processes (fields: [{}])", fields);

        let handles = self.source.enumerate(fields).map_err(|e| {
            debug!("snapshot: enumeration failed: {}", e);
            e
        })?;
        debug!("snapshot: {} processes enumerated", handles.len());

        let mut records = Vec::with_capacity(handles.len());
        let mut skipped = 0usize;
        for handle in &handles {
            match self.read_record(handle, fields) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        debug!(
            "snapshot: done, {} records ({} skipped)",
            records.len(),
            skipped
        );
        Ok(records)
    }

    fn read_record(&self, handle: &S::Handle, fields: &FieldSelector) -> Option<ProcessRecord> {
        let pid = match self.source.pid(handle) {
            Some(pid) if pid != 0 => pid,
            _ => {
                trace!("snapshot: skipping entry without a pid");
                return None;
            }
        };

        let mut record = ProcessRecord::default();
        if fields.pid {
            record.pid = pid;
        }

        if fields.wants_identity() {
            if let Some(identity) = degrade(pid, "identity", self.source.read_identity(handle, fields)) {
                if fields.ppid {
                    record.ppid = identity.ppid.unwrap_or_default();
                }
                if fields.name {
                    record.name = identity.name.unwrap_or_default();
                }
                if fields.path {
                    record.path = identity.path.unwrap_or_default();
                }
                if fields.cmdline {
                    record.cmdline = identity.cmdline.unwrap_or_default();
                }
            }
        }

        if fields.owner {
            if let Some(owner) = degrade(pid, "owner", self.source.read_ownership(handle)) {
                record.owner = owner;
            }
        }

        if fields.wants_scheduling() {
            if let Some(sched) = degrade(pid, "scheduling", self.source.read_scheduling(handle)) {
                if fields.threads {
                    record.threads = sched.threads;
                }
                if fields.priority {
                    record.priority = sched.priority;
                }
            }
        }

        if fields.wants_timing() {
            if let Some(timing) = degrade(pid, "timing", self.source.read_timing(handle)) {
                if fields.starttime {
                    record.starttime = timing.start_time_ms;
                }
                if fields.utime {
                    record.utime = timing.user_ms;
                }
                if fields.stime {
                    record.stime = timing.kernel_ms;
                }
                if fields.cpu {
                    let cpu_ms = timing.user_ms.saturating_add(timing.kernel_ms);
                    record.cpu = metrics::cpu_percent(cpu_ms, timing.elapsed_ms);
                }
            }
        }

        if fields.wants_memory() {
            if let Some(mem) = degrade(pid, "memory", self.source.read_memory(handle)) {
                if fields.vmem {
                    record.vmem = mem.virtual_bytes;
                }
                if fields.pmem {
                    record.pmem = mem.resident_bytes;
                }
            }
        }

        Some(record)
    }
}

/// Swallow a reader failure, leaving the caller's defaults in place
fn degrade<T>(pid: u32, group: &str, result: ReadResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            trace!("pid {}: {} unavailable: {}", pid, group, e);
            None
        }
    }
}
