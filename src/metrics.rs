//! Derived metrics and unit normalization
//!
//! Kernels report time in their own units: Linux in clock ticks, Windows in
//! 100-nanosecond FILETIME intervals and WMI in `CIM_DATETIME` strings. Records
//! only ever carry milliseconds, and CPU usage is derived here from the
//! normalized counters.

use chrono::{Duration, NaiveDateTime};

/// Milliseconds per second
pub const MS_PER_SEC: u64 = 1_000;

/// FILETIME (100 ns) units per millisecond
pub const FILETIME_UNITS_PER_MS: u64 = 10_000;

/// FILETIME value of 1970-01-01T00:00:00Z (FILETIME counts from 1601-01-01)
pub const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// Convert clock ticks to milliseconds at `ticks_per_sec` Hz
///
/// A zero tick rate yields 0 rather than a division fault.
pub fn ticks_to_ms(ticks: u64, ticks_per_sec: u64) -> u64 {
    if ticks_per_sec == 0 {
        return 0;
    }
    let ms = u128::from(ticks) * u128::from(MS_PER_SEC) / u128::from(ticks_per_sec);
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Convert a duration in 100 ns units to milliseconds (truncating)
pub fn filetime_to_ms(units: u64) -> u64 {
    units / FILETIME_UNITS_PER_MS
}

/// Convert an absolute FILETIME to Unix epoch milliseconds
///
/// Times before 1970 have no representation and yield `None`.
pub fn filetime_to_unix_ms(filetime: u64) -> Option<u64> {
    filetime
        .checked_sub(FILETIME_UNIX_EPOCH)
        .map(filetime_to_ms)
}

/// Convert a `CIM_DATETIME` string to an absolute FILETIME
///
/// Format is `yyyymmddHHMMSS.mmmmmmsUUU` where `mmmmmm` is microseconds and
/// `sUUU` is the signed offset from UTC in minutes, e.g.
/// `20240301120000.500000+060`.
pub fn cim_datetime_to_filetime(cim: &str) -> Option<u64> {
    let cim = cim.trim();
    if cim.len() < 25 || !cim.is_ascii() {
        return None;
    }

    let local = NaiveDateTime::parse_from_str(&cim[..14], "%Y%m%d%H%M%S").ok()?;
    if &cim[14..15] != "." {
        return None;
    }
    let micros: i64 = cim[15..21].parse().ok()?;
    let offset_min: i64 = cim[22..25].parse().ok()?;
    let offset_min = match &cim[21..22] {
        "+" => offset_min,
        "-" => -offset_min,
        _ => return None,
    };

    // CIM stores local time plus the zone offset; UTC = local - offset
    let utc = local + Duration::microseconds(micros) - Duration::minutes(offset_min);
    let unix_100ns = utc.and_utc().timestamp_micros().checked_mul(10)?;
    let filetime = i64::try_from(FILETIME_UNIX_EPOCH)
        .ok()?
        .checked_add(unix_100ns)?;
    u64::try_from(filetime).ok()
}

/// Convert a `CIM_DATETIME` string to Unix epoch milliseconds
pub fn cim_datetime_to_unix_ms(cim: &str) -> Option<u64> {
    cim_datetime_to_filetime(cim).and_then(filetime_to_unix_ms)
}

/// Start time of a process in Unix epoch ms
///
/// `uptime_ms` is the system uptime and `started_after_boot_ms` the process
/// start offset from boot, both taken at `now_ms`.
pub fn process_start_ms(now_ms: u64, uptime_ms: u64, started_after_boot_ms: u64) -> u64 {
    now_ms.saturating_sub(uptime_ms.saturating_sub(started_after_boot_ms))
}

/// CPU usage since process start, in percent
///
/// `(cpu_ms / elapsed_ms) * 100`, clamped to `[0, 100]`. Zero elapsed time
/// yields 0.
pub fn cpu_percent(cpu_ms: u64, elapsed_ms: u64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    let pct = cpu_ms as f64 / elapsed_ms as f64 * 100.0;
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}

/// Current wall-clock time in Unix epoch milliseconds
pub fn now_unix_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_to_ms() {
        assert_eq!(ticks_to_ms(250, 100), 2500);
        assert_eq!(ticks_to_ms(1, 100), 10);
        assert_eq!(ticks_to_ms(3, 1000), 3);
        assert_eq!(ticks_to_ms(250, 0), 0);
        assert_eq!(ticks_to_ms(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_filetime_to_ms() {
        assert_eq!(filetime_to_ms(50_000_000), 5000);
        assert_eq!(filetime_to_ms(9_999), 0);
        assert_eq!(filetime_to_ms(10_000), 1);
    }

    #[test]
    fn test_filetime_to_unix_ms() {
        assert_eq!(filetime_to_unix_ms(FILETIME_UNIX_EPOCH), Some(0));
        assert_eq!(
            filetime_to_unix_ms(FILETIME_UNIX_EPOCH + 50_000_000),
            Some(5000)
        );
        assert_eq!(filetime_to_unix_ms(0), None);
    }

    #[test]
    fn test_cim_datetime_utc() {
        // 2024-03-01T12:00:00.5Z
        assert_eq!(
            cim_datetime_to_unix_ms("20240301120000.500000+000"),
            Some(1_709_294_400_500)
        );
    }

    #[test]
    fn test_cim_datetime_offsets() {
        // 13:00 at UTC+60min and 11:00 at UTC-60min are both 12:00Z
        let expected = Some(1_709_294_400_000);
        assert_eq!(cim_datetime_to_unix_ms("20240301130000.000000+060"), expected);
        assert_eq!(cim_datetime_to_unix_ms("20240301110000.000000-060"), expected);
    }

    #[test]
    fn test_cim_datetime_epoch_filetime() {
        assert_eq!(
            cim_datetime_to_filetime("19700101000000.000000+000"),
            Some(FILETIME_UNIX_EPOCH)
        );
    }

    #[test]
    fn test_cim_datetime_malformed() {
        assert_eq!(cim_datetime_to_unix_ms(""), None);
        assert_eq!(cim_datetime_to_unix_ms("2024"), None);
        assert_eq!(cim_datetime_to_unix_ms("20240301120000.500000*000"), None);
        assert_eq!(cim_datetime_to_unix_ms("2024030112****.******+***"), None);
        assert_eq!(cim_datetime_to_unix_ms("16000101000000.000000+000"), None);
    }

    #[test]
    fn test_process_start_ms() {
        // booted 10s ago, process started 4s after boot => started 6s ago
        assert_eq!(process_start_ms(100_000, 10_000, 4_000), 94_000);
        // start offset beyond uptime (clock skew) => now
        assert_eq!(process_start_ms(100_000, 10_000, 20_000), 100_000);
    }

    #[test]
    fn test_cpu_percent() {
        assert_eq!(cpu_percent(500, 1000), 50.0);
        assert_eq!(cpu_percent(0, 1000), 0.0);
        assert_eq!(cpu_percent(1000, 0), 0.0);
        assert_eq!(cpu_percent(0, 0), 0.0);
    }

    #[test]
    fn test_cpu_percent_always_clamped() {
        // multithreaded processes can exceed wall time
        assert_eq!(cpu_percent(4000, 1000), 100.0);
        assert_eq!(cpu_percent(u64::MAX, 1), 100.0);
        for cpu_ms in [0u64, 1, 999, 1000, 1001, u64::MAX / 2] {
            for elapsed in [0u64, 1, 1000, u64::MAX] {
                let pct = cpu_percent(cpu_ms, elapsed);
                assert!((0.0..=100.0).contains(&pct), "{cpu_ms}/{elapsed} -> {pct}");
            }
        }
    }
}
