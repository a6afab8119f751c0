//! WMI process source
//!
//! One `Win32_Process` query per snapshot supplies the table and every
//! WMI-backed attribute. The image path and the owner are not reliable through
//! WMI (the `GetOwner` method costs a round trip per process), so those two
//! come from a limited-information process handle opened on first use.

use super::handle::ProcessHandle;
use super::query::{self, Row};
use crate::error::EnumerationError;
use crate::fields::FieldSelector;
use crate::metrics;
use crate::source::{Identity, Memory, ProcessSource, ReadError, ReadResult, Scheduling, Timing};
use log::{debug, trace};
use std::cell::OnceCell;
use wmi::{COMLibrary, WMIConnection};

/// WMI namespace holding `Win32_Process`
const CIMV2: &str = "root\\CIMV2";

const BYTES_PER_KIB: u64 = 1024;

/// One row of the process query
#[derive(Debug)]
pub struct WmiProcess {
    row: Row,
    pid: Option<u32>,
    handle: OnceCell<Option<ProcessHandle>>,
}

impl WmiProcess {
    fn new(row: Row) -> Self {
        let pid = query::prop_u32(&row, query::PROCESS_ID);
        Self {
            row,
            pid,
            handle: OnceCell::new(),
        }
    }

    /// Opened at most once; a failed open is remembered
    fn handle(&self) -> ReadResult<&ProcessHandle> {
        let pid = self
            .pid
            .ok_or_else(|| ReadError::Unavailable("process without id".to_string()))?;
        self.handle
            .get_or_init(|| match ProcessHandle::open(pid) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    trace!("pid {}: {}", pid, e);
                    None
                }
            })
            .as_ref()
            .ok_or_else(|| ReadError::Unavailable(format!("pid {}: no process handle", pid)))
    }

    fn required_u64(&self, name: &str) -> ReadResult<u64> {
        query::prop_u64(&self.row, name)
            .ok_or_else(|| ReadError::Unavailable(format!("{} not reported", name)))
    }
}

/// Process source backed by `Win32_Process`
#[derive(Debug, Default)]
pub struct WmiSource {
    /// Wall clock when the query returned
    sampled_ms: u64,
}

impl WmiSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessSource for WmiSource {
    type Handle = WmiProcess;

    fn enumerate(&mut self, fields: &FieldSelector) -> Result<Vec<WmiProcess>, EnumerationError> {
        let com_con = match COMLibrary::new() {
            Ok(com) => com,
            // already initialized by the host with other settings
            Err(e) => {
                debug!("COM security setup failed, reusing caller's: {}", e);
                COMLibrary::without_security().map_err(EnumerationError::Session)?
            }
        };
        let wmi_con = WMIConnection::with_namespace_path(CIMV2, com_con.into())
            .map_err(EnumerationError::Session)?;

        let wql = query::process_query(fields);
        debug!("WMI query: {}", wql);
        let rows: Vec<Row> = wmi_con.raw_query(&wql).map_err(EnumerationError::Query)?;
        self.sampled_ms = metrics::now_unix_ms();

        Ok(rows.into_iter().map(WmiProcess::new).collect())
    }

    fn pid(&self, process: &WmiProcess) -> Option<u32> {
        process.pid
    }

    fn read_identity(&self, process: &WmiProcess, fields: &FieldSelector) -> ReadResult<Identity> {
        let mut identity = Identity::default();

        if fields.ppid {
            identity.ppid = query::prop_u32(&process.row, query::PARENT_PROCESS_ID);
        }
        if fields.name {
            identity.name = query::prop_string(&process.row, query::NAME);
        }
        if fields.cmdline {
            identity.cmdline = query::prop_string(&process.row, query::COMMAND_LINE);
        }
        if fields.path {
            identity.path = match process.handle().and_then(ProcessHandle::image_path) {
                Ok(path) => Some(path),
                Err(e) => {
                    trace!("pid {:?}: image path unavailable: {}", process.pid, e);
                    None
                }
            };
        }

        Ok(identity)
    }

    fn read_ownership(&self, process: &WmiProcess) -> ReadResult<String> {
        process.handle()?.owner()
    }

    fn read_scheduling(&self, process: &WmiProcess) -> ReadResult<Scheduling> {
        Ok(Scheduling {
            threads: query::prop_u32(&process.row, query::THREAD_COUNT).unwrap_or(0),
            priority: query::prop_i32(&process.row, query::PRIORITY).unwrap_or(0),
        })
    }

    fn read_timing(&self, process: &WmiProcess) -> ReadResult<Timing> {
        let user = process.required_u64(query::USER_MODE_TIME)?;
        let kernel = process.required_u64(query::KERNEL_MODE_TIME)?;

        // System and a few protected processes report no creation date
        let start_time_ms = query::prop_string(&process.row, query::CREATION_DATE)
            .as_deref()
            .and_then(metrics::cim_datetime_to_unix_ms)
            .unwrap_or(0);
        let elapsed_ms = if start_time_ms == 0 {
            0
        } else {
            self.sampled_ms.saturating_sub(start_time_ms)
        };

        Ok(Timing {
            start_time_ms,
            elapsed_ms,
            user_ms: metrics::filetime_to_ms(user),
            kernel_ms: metrics::filetime_to_ms(kernel),
        })
    }

    fn read_memory(&self, process: &WmiProcess) -> ReadResult<Memory> {
        Ok(Memory {
            virtual_bytes: query::prop_u64(&process.row, query::PAGE_FILE_USAGE)
                .unwrap_or(0)
                .saturating_mul(BYTES_PER_KIB),
            resident_bytes: query::prop_u64(&process.row, query::WORKING_SET_SIZE).unwrap_or(0),
        })
    }
}
