//! Per-process record

use crate::fields::{Field, FieldSelector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One process as observed at snapshot time
///
/// Fields that were not requested, or whose source could not be read, hold
/// their zero/empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process ID
    pub pid: u32,
    /// Parent process ID (0 if unknown)
    pub ppid: u32,
    /// Executable basename
    pub name: String,
    /// Absolute path to the executable image
    pub path: String,
    /// Command line, arguments separated by single spaces
    pub cmdline: String,
    /// User owning the process
    pub owner: String,
    /// Thread count
    pub threads: u32,
    /// OS-specific priority (not normalized)
    pub priority: i32,
    /// Start time in Unix epoch milliseconds
    pub starttime: u64,
    /// Virtual memory size in bytes
    pub vmem: u64,
    /// Resident set size in bytes
    pub pmem: u64,
    /// CPU usage since start, 0-100
    pub cpu: f64,
    /// User-mode CPU time in milliseconds
    pub utime: u64,
    /// Kernel-mode CPU time in milliseconds
    pub stime: u64,
}

impl ProcessRecord {
    /// Value of a single field as JSON
    pub fn value(&self, field: Field) -> Value {
        match field {
            Field::Pid => self.pid.into(),
            Field::Ppid => self.ppid.into(),
            Field::Name => self.name.clone().into(),
            Field::Path => self.path.clone().into(),
            Field::Cmdline => self.cmdline.clone().into(),
            Field::Owner => self.owner.clone().into(),
            Field::Threads => self.threads.into(),
            Field::Priority => self.priority.into(),
            Field::Starttime => self.starttime.into(),
            Field::Vmem => self.vmem.into(),
            Field::Pmem => self.pmem.into(),
            Field::Cpu => self.cpu.into(),
            Field::Utime => self.utime.into(),
            Field::Stime => self.stime.into(),
        }
    }

    /// JSON object holding only the selected keys, in canonical order
    pub fn project(&self, fields: &FieldSelector) -> Value {
        let mut map = Map::new();
        for field in fields.fields() {
            map.insert(field.name().to_string(), self.value(field));
        }
        Value::Object(map)
    }

    /// Resident set size in megabytes
    pub fn pmem_mb(&self) -> f64 {
        self.pmem as f64 / (1024.0 * 1024.0)
    }

    /// Total CPU time (user + kernel) in milliseconds
    pub fn cpu_time_ms(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_only_selected_keys() {
        let record = ProcessRecord {
            pid: 42,
            name: "init".to_string(),
            owner: "root".to_string(),
            ..Default::default()
        };
        let sel = FieldSelector::none().with(Field::Name).with(Field::Pid);
        let value = record.project(&sel);
        let obj = value.as_object().unwrap();

        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(obj["pid"], 42);
        assert_eq!(obj["name"], "init");
        assert!(obj.get("owner").is_none());
    }

    #[test]
    fn test_project_empty_selector() {
        let record = ProcessRecord::default();
        let value = record.project(&FieldSelector::none());
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_cpu_time_saturates() {
        let record = ProcessRecord {
            utime: u64::MAX,
            stime: 10,
            ..Default::default()
        };
        assert_eq!(record.cpu_time_ms(), u64::MAX);
    }
}
