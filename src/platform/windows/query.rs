//! `Win32_Process` query construction and property decoding

use crate::fields::FieldSelector;
use std::collections::HashMap;
use wmi::Variant;

pub const PROCESS_ID: &str = "ProcessId";
pub const PARENT_PROCESS_ID: &str = "ParentProcessId";
pub const NAME: &str = "Name";
pub const COMMAND_LINE: &str = "CommandLine";
pub const THREAD_COUNT: &str = "ThreadCount";
pub const PRIORITY: &str = "Priority";
pub const CREATION_DATE: &str = "CreationDate";
pub const USER_MODE_TIME: &str = "UserModeTime";
pub const KERNEL_MODE_TIME: &str = "KernelModeTime";
/// KiB
pub const PAGE_FILE_USAGE: &str = "PageFileUsage";
/// Bytes
pub const WORKING_SET_SIZE: &str = "WorkingSetSize";

/// One `Win32_Process` instance
pub type Row = HashMap<String, Variant>;

/// WQL selecting only the properties `fields` needs
///
/// `ProcessId` is always present since it identifies the record. Path and
/// owner come from the process handle, not from WMI.
pub fn process_query(fields: &FieldSelector) -> String {
    let mut props = vec![PROCESS_ID];
    if fields.ppid {
        props.push(PARENT_PROCESS_ID);
    }
    if fields.name {
        props.push(NAME);
    }
    if fields.cmdline {
        props.push(COMMAND_LINE);
    }
    if fields.threads {
        props.push(THREAD_COUNT);
    }
    if fields.priority {
        props.push(PRIORITY);
    }
    if fields.wants_timing() {
        props.extend([CREATION_DATE, USER_MODE_TIME, KERNEL_MODE_TIME]);
    }
    if fields.vmem {
        props.push(PAGE_FILE_USAGE);
    }
    if fields.pmem {
        props.push(WORKING_SET_SIZE);
    }
    format!("SELECT {} FROM Win32_Process", props.join(", "))
}

/// Unsigned integer property; CIM uint64 arrives as a decimal string
pub fn prop_u64(row: &Row, name: &str) -> Option<u64> {
    match row.get(name)? {
        Variant::UI1(v) => Some(u64::from(*v)),
        Variant::UI2(v) => Some(u64::from(*v)),
        Variant::UI4(v) => Some(u64::from(*v)),
        Variant::UI8(v) => Some(*v),
        Variant::I1(v) => u64::try_from(*v).ok(),
        Variant::I2(v) => u64::try_from(*v).ok(),
        Variant::I4(v) => u64::try_from(*v).ok(),
        Variant::I8(v) => u64::try_from(*v).ok(),
        Variant::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn prop_u32(row: &Row, name: &str) -> Option<u32> {
    prop_u64(row, name).and_then(|v| u32::try_from(v).ok())
}

pub fn prop_i32(row: &Row, name: &str) -> Option<i32> {
    prop_u64(row, name).and_then(|v| i32::try_from(v).ok())
}

/// String property; null and empty are both `None`
pub fn prop_string(row: &Row, name: &str) -> Option<String> {
    match row.get(name)? {
        Variant::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;

    #[test]
    fn test_query_minimal() {
        assert_eq!(
            process_query(&FieldSelector::none()),
            "SELECT ProcessId FROM Win32_Process"
        );
        // path and owner are read through the process handle
        let fields = FieldSelector::none().with(Field::Path).with(Field::Owner);
        assert_eq!(process_query(&fields), "SELECT ProcessId FROM Win32_Process");
    }

    #[test]
    fn test_query_timing_group() {
        let query = process_query(&FieldSelector::none().with(Field::Cpu));
        assert_eq!(
            query,
            "SELECT ProcessId, CreationDate, UserModeTime, KernelModeTime FROM Win32_Process"
        );
    }

    #[test]
    fn test_props() {
        let mut row = Row::new();
        row.insert(PROCESS_ID.to_string(), Variant::UI4(4));
        row.insert(USER_MODE_TIME.to_string(), Variant::String("50000000".to_string()));
        row.insert(COMMAND_LINE.to_string(), Variant::Null);
        row.insert(NAME.to_string(), Variant::String("System".to_string()));
        row.insert(PRIORITY.to_string(), Variant::I4(-1));

        assert_eq!(prop_u32(&row, PROCESS_ID), Some(4));
        assert_eq!(prop_u64(&row, USER_MODE_TIME), Some(50_000_000));
        assert_eq!(prop_string(&row, COMMAND_LINE), None);
        assert_eq!(prop_string(&row, NAME).as_deref(), Some("System"));
        assert_eq!(prop_i32(&row, PRIORITY), None);
        assert_eq!(prop_u32(&row, THREAD_COUNT), None);
    }
}
