//! `/proc` process source
//!
//! Every numeric directory under `/proc` is a process. Per-process files are
//! read lazily: `stat` is parsed at most once per process and shared by the
//! identity, scheduling and timing readers, and nothing is opened for groups
//! the caller did not ask for.

use super::stat::{parse_stat, StatRecord};
use super::sys;
use crate::error::EnumerationError;
use crate::fields::FieldSelector;
use crate::metrics;
use crate::platform::common::{basename, read_file_capped, read_file_string, read_first_f64};
use crate::source::{Identity, Memory, ProcessSource, ReadError, ReadResult, Scheduling, Timing};
use log::trace;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Upper bound on bytes read from `/proc/[pid]/cmdline`
pub const CMDLINE_MAX: usize = 4096;

const PROC_ROOT: &str = "/proc";

/// Wall clock and system uptime sampled together
#[derive(Debug, Clone, Copy)]
struct Clock {
    now_ms: u64,
    uptime_ms: u64,
}

/// One `/proc/[pid]` directory
#[derive(Debug)]
pub struct ProcEntry {
    pid: u32,
    dir: PathBuf,
    stat: OnceCell<Result<StatRecord, String>>,
}

impl ProcEntry {
    fn new(pid: u32, dir: PathBuf) -> Self {
        Self {
            pid,
            dir,
            stat: OnceCell::new(),
        }
    }

    fn stat(&self) -> ReadResult<&StatRecord> {
        self.stat
            .get_or_init(|| {
                read_file_string(self.dir.join("stat"))
                    .and_then(|line| parse_stat(&line))
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| ReadError::Unavailable(format!("stat: {}", e)))
    }
}

/// Process source backed by the proc filesystem
#[derive(Debug)]
pub struct ProcSource {
    root: PathBuf,
    clock: OnceCell<Option<Clock>>,
    users: RefCell<HashMap<u32, Option<String>>>,
}

impl ProcSource {
    /// Source reading the live `/proc`
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    /// Source reading a proc tree mounted elsewhere
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            clock: OnceCell::new(),
            users: RefCell::new(HashMap::new()),
        }
    }

    /// Sampled once per snapshot, on first timing read
    fn clock(&self) -> ReadResult<Clock> {
        self.clock
            .get_or_init(|| match read_first_f64(self.root.join("uptime")) {
                Ok(uptime_secs) => Some(Clock {
                    now_ms: metrics::now_unix_ms(),
                    uptime_ms: (uptime_secs * metrics::MS_PER_SEC as f64) as u64,
                }),
                Err(e) => {
                    trace!("uptime unavailable: {}", e);
                    None
                }
            })
            .ok_or_else(|| ReadError::Unavailable("system uptime".to_string()))
    }

    /// UID to name, memoized for the lifetime of this source
    fn user_name(&self, uid: u32) -> ReadResult<String> {
        if let Some(cached) = self.users.borrow().get(&uid) {
            return cached
                .clone()
                .ok_or_else(|| ReadError::Unavailable(format!("uid {}", uid)));
        }
        let resolved = sys::user_name(uid);
        let cached = resolved.as_ref().ok().cloned();
        self.users.borrow_mut().insert(uid, cached);
        resolved
    }
}

impl Default for ProcSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for ProcSource {
    type Handle = ProcEntry;

    fn enumerate(&mut self, _fields: &FieldSelector) -> Result<Vec<ProcEntry>, EnumerationError> {
        let root = &self.root;
        let dir_error = |source: io::Error| EnumerationError::ProcDirectory {
            path: root.display().to_string(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(root).map_err(dir_error)? {
            let entry = entry.map_err(dir_error)?;
            if let Some(pid) = entry.file_name().to_str().and_then(parse_pid) {
                entries.push(ProcEntry::new(pid, entry.path()));
            }
        }
        Ok(entries)
    }

    fn pid(&self, entry: &ProcEntry) -> Option<u32> {
        Some(entry.pid)
    }

    fn read_identity(&self, entry: &ProcEntry, fields: &FieldSelector) -> ReadResult<Identity> {
        let mut identity = Identity::default();

        if fields.name || fields.path {
            match fs::read_link(entry.dir.join("exe")) {
                Ok(target) => {
                    let path = target.to_string_lossy().into_owned();
                    if fields.name {
                        identity.name = Some(basename(&path).to_string());
                    }
                    if fields.path {
                        identity.path = Some(path);
                    }
                }
                Err(e) => trace!("pid {}: exe link unreadable: {}", entry.pid, e),
            }

            // kernel threads and foreign processes: fall back to comm
            if fields.name && identity.name.is_none() {
                identity.name = entry.stat().ok().map(|stat| stat.comm.clone());
            }
        }

        if fields.cmdline {
            identity.cmdline = match read_cmdline(&entry.dir) {
                Ok(cmdline) => Some(cmdline),
                Err(e) => {
                    trace!("pid {}: cmdline unreadable: {}", entry.pid, e);
                    None
                }
            };
        }

        if fields.ppid {
            identity.ppid = entry.stat().ok().map(|stat| stat.ppid);
        }

        Ok(identity)
    }

    fn read_ownership(&self, entry: &ProcEntry) -> ReadResult<String> {
        let uid = fs::metadata(&entry.dir)?.uid();
        self.user_name(uid)
    }

    fn read_scheduling(&self, entry: &ProcEntry) -> ReadResult<Scheduling> {
        let stat = entry.stat()?;
        Ok(Scheduling {
            threads: u32::try_from(stat.num_threads).unwrap_or(0),
            priority: i32::try_from(stat.priority).unwrap_or(0),
        })
    }

    fn read_timing(&self, entry: &ProcEntry) -> ReadResult<Timing> {
        let stat = entry.stat()?;
        let clock = self.clock()?;
        let hz = sys::clock_ticks();

        let started_after_boot_ms = metrics::ticks_to_ms(stat.starttime, hz);
        Ok(Timing {
            start_time_ms: metrics::process_start_ms(
                clock.now_ms,
                clock.uptime_ms,
                started_after_boot_ms,
            ),
            elapsed_ms: clock.uptime_ms.saturating_sub(started_after_boot_ms),
            user_ms: metrics::ticks_to_ms(stat.utime, hz),
            kernel_ms: metrics::ticks_to_ms(stat.stime, hz),
        })
    }

    fn read_memory(&self, entry: &ProcEntry) -> ReadResult<Memory> {
        let statm = read_file_string(entry.dir.join("statm"))?;
        parse_statm(&statm, sys::page_size())
    }
}

/// Directory name to pid: all ASCII digits and not zero
fn parse_pid(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|&pid| pid != 0)
}

fn read_cmdline(dir: &Path) -> ReadResult<String> {
    let raw = read_file_capped(dir.join("cmdline"), CMDLINE_MAX)?;
    Ok(normalize_cmdline(&raw))
}

/// NUL-separated argv to one printable line
fn normalize_cmdline(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let joined: Vec<u8> = raw[..end]
        .iter()
        .map(|&b| if b == 0 || b == b'\n' { b' ' } else { b })
        .collect();
    String::from_utf8_lossy(&joined).into_owned()
}

/// `size resident shared text lib data dt`, all in pages
fn parse_statm(statm: &str, page_size: u64) -> ReadResult<Memory> {
    let mut pages = statm.split_whitespace().map(|t| {
        t.parse::<u64>()
            .map_err(|e| ReadError::Malformed(format!("statm {:?}: {}", t, e)))
    });
    let mut next = || {
        pages
            .next()
            .unwrap_or_else(|| Err(ReadError::Malformed("statm too short".to_string())))
    };
    let size = next()?;
    let resident = next()?;
    Ok(Memory {
        virtual_bytes: size.saturating_mul(page_size),
        resident_bytes: resident.saturating_mul(page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use std::os::unix::fs::symlink;

    /// Throwaway proc tree under the system temp dir
    struct FakeProc {
        root: PathBuf,
    }

    impl FakeProc {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "tasklist-proc-{}-{}",
                std::process::id(),
                tag
            ));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            fs::write(root.join("uptime"), "1000.00 3000.00\n").unwrap();
            Self { root }
        }

        fn add(&self, pid: u32, stat: &str, cmdline: &[u8], exe: Option<&str>) -> PathBuf {
            let dir = self.root.join(pid.to_string());
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("stat"), stat).unwrap();
            fs::write(dir.join("cmdline"), cmdline).unwrap();
            fs::write(dir.join("statm"), "1000 250 100 10 0 300 0\n").unwrap();
            if let Some(target) = exe {
                symlink(target, dir.join("exe")).unwrap();
            }
            dir
        }

        fn source(&self) -> ProcSource {
            ProcSource::with_root(&self.root)
        }
    }

    impl Drop for FakeProc {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    // utime 250, stime 50, starttime 10000 ticks
    const SHELL_STAT: &str =
        "42 (bash) S 1 42 42 0 -1 4194304 0 0 0 0 250 50 0 0 20 0 3 0 10000 4096000 250\n";
    const KTHREAD_STAT: &str =
        "7 (kworker/0:1-events) I 2 0 0 0 -1 69238880 0 0 0 0 0 12 0 0 20 0 1 0 15 0 0\n";

    fn entry(source: &mut ProcSource, pid: u32) -> ProcEntry {
        source
            .enumerate(&FieldSelector::all())
            .unwrap()
            .into_iter()
            .find(|e| e.pid == pid)
            .unwrap()
    }

    #[test]
    fn test_parse_pid() {
        assert_eq!(parse_pid("1"), Some(1));
        assert_eq!(parse_pid("4242"), Some(4242));
        assert_eq!(parse_pid("0"), None);
        assert_eq!(parse_pid("00"), None);
        assert_eq!(parse_pid("self"), None);
        assert_eq!(parse_pid("+5"), None);
        assert_eq!(parse_pid("12a"), None);
        assert_eq!(parse_pid(""), None);
    }

    #[test]
    fn test_normalize_cmdline() {
        assert_eq!(normalize_cmdline(b"/bin/sh\0-c\0echo hi\0"), "/bin/sh -c echo hi");
        assert_eq!(normalize_cmdline(b"nginx: worker\nprocess"), "nginx: worker process");
        assert_eq!(normalize_cmdline(b""), "");
        assert_eq!(normalize_cmdline(b"\0\0"), "");
    }

    #[test]
    fn test_parse_statm() {
        let mem = parse_statm("1000 250 100 10 0 300 0", 4096).unwrap();
        assert_eq!(mem.virtual_bytes, 4_096_000);
        assert_eq!(mem.resident_bytes, 1_024_000);
        assert!(parse_statm("1000", 4096).is_err());
        assert!(parse_statm("abc 1", 4096).is_err());
    }

    #[test]
    fn test_enumerate_filters_non_pids() {
        let fake = FakeProc::new("enumerate");
        fake.add(42, SHELL_STAT, b"bash\0", Some("/usr/bin/bash"));
        fake.add(7, KTHREAD_STAT, b"", None);
        fs::create_dir_all(fake.root.join("0")).unwrap();
        fs::create_dir_all(fake.root.join("sys")).unwrap();
        fs::create_dir_all(fake.root.join("12abc")).unwrap();
        symlink("42", fake.root.join("self")).unwrap();

        let mut pids: Vec<u32> = fake
            .source()
            .enumerate(&FieldSelector::none())
            .unwrap()
            .iter()
            .map(|e| e.pid)
            .collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![7, 42]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let mut source = ProcSource::with_root("/nonexistent/tasklist/proc");
        let err = source.enumerate(&FieldSelector::all()).unwrap_err();
        assert!(matches!(err, EnumerationError::ProcDirectory { .. }));
    }

    #[test]
    fn test_identity_from_exe_link() {
        let fake = FakeProc::new("identity");
        fake.add(42, SHELL_STAT, b"-bash\0--login\0", Some("/usr/bin/bash"));
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let identity = source.read_identity(&e, &FieldSelector::all()).unwrap();
        assert_eq!(identity.path.as_deref(), Some("/usr/bin/bash"));
        assert_eq!(identity.name.as_deref(), Some("bash"));
        assert_eq!(identity.cmdline.as_deref(), Some("-bash --login"));
        assert_eq!(identity.ppid, Some(1));
    }

    #[test]
    fn test_identity_only_requested_fields() {
        let fake = FakeProc::new("identity-sel");
        fake.add(42, SHELL_STAT, b"bash\0", Some("/usr/bin/bash"));
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let fields = FieldSelector::none().with(Field::Cmdline);
        let identity = source.read_identity(&e, &fields).unwrap();
        assert_eq!(identity.cmdline.as_deref(), Some("bash"));
        assert_eq!(identity.name, None);
        assert_eq!(identity.path, None);
        assert_eq!(identity.ppid, None);
        // stat was never needed
        assert!(e.stat.get().is_none());
    }

    #[test]
    fn test_kernel_thread_identity() {
        let fake = FakeProc::new("kthread");
        fake.add(7, KTHREAD_STAT, b"", None);
        let mut source = fake.source();
        let e = entry(&mut source, 7);

        let identity = source.read_identity(&e, &FieldSelector::all()).unwrap();
        assert_eq!(identity.path, None);
        assert_eq!(identity.name.as_deref(), Some("kworker/0:1-events"));
        assert_eq!(identity.cmdline.as_deref(), Some(""));
        assert_eq!(identity.ppid, Some(2));
    }

    #[test]
    fn test_cmdline_capped() {
        let fake = FakeProc::new("cmdline-cap");
        let long = vec![b'x'; CMDLINE_MAX * 2];
        fake.add(42, SHELL_STAT, &long, None);
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let fields = FieldSelector::none().with(Field::Cmdline);
        let cmdline = source.read_identity(&e, &fields).unwrap().cmdline.unwrap();
        assert_eq!(cmdline.len(), CMDLINE_MAX);
    }

    #[test]
    fn test_scheduling_and_memory() {
        let fake = FakeProc::new("sched");
        fake.add(42, SHELL_STAT, b"bash\0", None);
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let sched = source.read_scheduling(&e).unwrap();
        assert_eq!(sched.threads, 3);
        assert_eq!(sched.priority, 20);

        let mem = source.read_memory(&e).unwrap();
        assert_eq!(mem.virtual_bytes, 1000 * sys::page_size());
        assert_eq!(mem.resident_bytes, 250 * sys::page_size());
    }

    #[test]
    fn test_timing() {
        let fake = FakeProc::new("timing");
        fake.add(42, SHELL_STAT, b"bash\0", None);
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let hz = sys::clock_ticks();
        let timing = source.read_timing(&e).unwrap();
        assert_eq!(timing.user_ms, metrics::ticks_to_ms(250, hz));
        assert_eq!(timing.kernel_ms, metrics::ticks_to_ms(50, hz));

        let started_after_boot = metrics::ticks_to_ms(10_000, hz);
        assert_eq!(timing.elapsed_ms, 1_000_000u64.saturating_sub(started_after_boot));

        let now = metrics::now_unix_ms();
        assert!(timing.start_time_ms <= now);
        assert!(timing.start_time_ms + timing.elapsed_ms <= now);
        assert!(now - (timing.start_time_ms + timing.elapsed_ms) < 60_000);
    }

    #[test]
    fn test_vanished_process_degrades() {
        let fake = FakeProc::new("vanish");
        let dir = fake.add(42, SHELL_STAT, b"bash\0", Some("/usr/bin/bash"));
        let mut source = fake.source();
        let e = entry(&mut source, 42);
        fs::remove_dir_all(dir).unwrap();

        let identity = source.read_identity(&e, &FieldSelector::all()).unwrap();
        assert_eq!(identity, Identity::default());
        assert!(source.read_ownership(&e).is_err());
        assert!(source.read_scheduling(&e).is_err());
        assert!(source.read_timing(&e).is_err());
        assert!(source.read_memory(&e).is_err());
    }

    #[test]
    fn test_owner_of_fake_dir_matches_current_user() {
        let fake = FakeProc::new("owner");
        fake.add(42, SHELL_STAT, b"bash\0", None);
        let mut source = fake.source();
        let e = entry(&mut source, 42);

        let expected = sys::user_name(nix::unistd::getuid().as_raw()).ok();
        assert_eq!(source.read_ownership(&e).ok(), expected);
        // second lookup served from the cache
        assert_eq!(source.read_ownership(&e).ok(), expected);
    }

    #[test]
    fn test_live_proc_contains_self() {
        let mut source = ProcSource::new();
        let me = std::process::id();
        let entries = source.enumerate(&FieldSelector::all()).unwrap();
        let e = entries.iter().find(|e| e.pid == me).unwrap();

        let identity = source.read_identity(e, &FieldSelector::all()).unwrap();
        let path = identity.path.unwrap();
        assert_eq!(basename(&path), identity.name.unwrap());
        assert!(source.read_scheduling(e).unwrap().threads >= 1);
        assert!(source.read_memory(e).unwrap().resident_bytes > 0);
    }
}
