//! Process-wide OS constants and user database lookups

use crate::source::{ReadError, ReadResult};
use log::warn;
use nix::unistd::{Uid, User};
use std::sync::OnceLock;

/// USER_HZ on every mainstream architecture
const DEFAULT_CLOCK_TICKS: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 4096;

static CLOCK_TICKS: OnceLock<u64> = OnceLock::new();
static PAGE_SIZE: OnceLock<u64> = OnceLock::new();

/// Kernel clock ticks per second (`_SC_CLK_TCK`), queried once
pub fn clock_ticks() -> u64 {
    *CLOCK_TICKS.get_or_init(|| sysconf_or(libc::_SC_CLK_TCK, "_SC_CLK_TCK", DEFAULT_CLOCK_TICKS))
}

/// Memory page size in bytes (`_SC_PAGESIZE`), queried once
pub fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(|| sysconf_or(libc::_SC_PAGESIZE, "_SC_PAGESIZE", DEFAULT_PAGE_SIZE))
}

fn sysconf_or(name: libc::c_int, label: &str, fallback: u64) -> u64 {
    // SAFETY: sysconf only reads a configuration value
    let value = unsafe { libc::sysconf(name) };
    if value > 0 {
        value as u64
    } else {
        warn!("sysconf({}) unavailable, assuming {}", label, fallback);
        fallback
    }
}

/// Resolve a UID through the system user database
pub fn user_name(uid: u32) -> ReadResult<String> {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Ok(user.name),
        Ok(None) => Err(ReadError::Unavailable(format!("no user entry for uid {}", uid))),
        Err(e) => Err(ReadError::Unavailable(format!("user lookup for uid {} failed: {}", uid, e))),
    }
}
