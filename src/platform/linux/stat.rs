//! `/proc/[pid]/stat` parsing
//!
//! The line is `pid (comm) state ppid ...`. `comm` is the executable name as
//! set by the process and may itself contain spaces and parentheses, so the
//! name ends at the *last* `)`. Everything after it is a fixed sequence of
//! whitespace-separated fields whose positions are defined by proc(5); the
//! constants below use the 1-based field numbers from that page.

use crate::source::{ReadError, ReadResult};
use std::str::FromStr;

const STATE: usize = 3;
const PPID: usize = 4;
const PGRP: usize = 5;
const UTIME: usize = 14;
const STIME: usize = 15;
const PRIORITY: usize = 18;
const NICE: usize = 19;
const NUM_THREADS: usize = 20;
const STARTTIME: usize = 22;

/// First field number after `comm`
const FIRST_AFTER_COMM: usize = STATE;

/// Fields of `/proc/[pid]/stat` this crate consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub pgrp: i32,
    /// Clock ticks in user mode
    pub utime: u64,
    /// Clock ticks in kernel mode
    pub stime: u64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    /// Clock ticks after boot at which the process started
    pub starttime: u64,
}

/// Parse one stat line
pub fn parse_stat(line: &str) -> ReadResult<StatRecord> {
    let open = line
        .find('(')
        .ok_or_else(|| ReadError::Malformed("No opening parenthesis in stat".to_string()))?;
    let close = line
        .rfind(')')
        .ok_or_else(|| ReadError::Malformed("No closing parenthesis in stat".to_string()))?;
    if close < open {
        return Err(ReadError::Malformed("Unbalanced parentheses in stat".to_string()));
    }

    let pid = parse_token(line[..open].trim(), "pid")?;
    let comm = line[open + 1..close].to_string();
    let rest: Vec<&str> = line[close + 1..].split_whitespace().collect();

    let state = field(&rest, STATE)?.chars().next().unwrap_or('?');

    Ok(StatRecord {
        pid,
        comm,
        state,
        ppid: parse_token(field(&rest, PPID)?, "ppid")?,
        pgrp: parse_token(field(&rest, PGRP)?, "pgrp")?,
        utime: parse_token(field(&rest, UTIME)?, "utime")?,
        stime: parse_token(field(&rest, STIME)?, "stime")?,
        priority: parse_token(field(&rest, PRIORITY)?, "priority")?,
        nice: parse_token(field(&rest, NICE)?, "nice")?,
        num_threads: parse_token(field(&rest, NUM_THREADS)?, "num_threads")?,
        starttime: parse_token(field(&rest, STARTTIME)?, "starttime")?,
    })
}

fn field<'a>(rest: &[&'a str], number: usize) -> ReadResult<&'a str> {
    rest.get(number - FIRST_AFTER_COMM).copied().ok_or_else(|| {
        ReadError::Malformed(format!(
            "stat has {} fields after comm, need field {}",
            rest.len(),
            number
        ))
    })
}

fn parse_token<T: FromStr>(token: &str, what: &str) -> ReadResult<T>
where
    T::Err: std::fmt::Display,
{
    token
        .parse()
        .map_err(|e| ReadError::Malformed(format!("Failed to parse {} {:?}: {}", what, token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASH: &str = "1234 (bash) S 1000 1234 1234 34816 5678 4194304 2500 10000 3 0 250 75 12 4 20 0 1 0 98765 23724032 1320 18446744073709551615 1 1 0 0 0 0 65536 3670020 1266777851 0 0 0 17 3 0 0 0 0 0";

    #[test]
    fn test_parse_simple() {
        let stat = parse_stat(BASH).unwrap();
        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1000);
        assert_eq!(stat.pgrp, 1234);
        assert_eq!(stat.utime, 250);
        assert_eq!(stat.stime, 75);
        assert_eq!(stat.priority, 20);
        assert_eq!(stat.nice, 0);
        assert_eq!(stat.num_threads, 1);
        assert_eq!(stat.starttime, 98765);
    }

    #[test]
    fn test_name_with_spaces_and_parens() {
        let line = "77 (my (odd) proc) R 1 77 77 0 -1 4194560 0 0 0 0 9 1 0 0 -2 0 3 0 400 0 0";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.comm, "my (odd) proc");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 9);
        assert_eq!(stat.stime, 1);
        assert_eq!(stat.priority, -2);
        assert_eq!(stat.num_threads, 3);
        assert_eq!(stat.starttime, 400);
    }

    #[test]
    fn test_name_with_closing_paren_and_digits() {
        let line = "9 () 1 2 3) S 2 0 0 0 -1 69238880 0 0 0 0 0 0 0 0 20 0 1 0 5 0 0";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.comm, ") 1 2 3");
        assert_eq!(stat.ppid, 2);
        assert_eq!(stat.starttime, 5);
    }

    #[test]
    fn test_truncated_line() {
        let err = parse_stat("1 (init) S 0 1 1").unwrap_err();
        assert!(matches!(err, ReadError::Malformed(_)));
    }

    #[test]
    fn test_missing_parens() {
        assert!(parse_stat("1 init S 0").is_err());
        assert!(parse_stat("").is_err());
        assert!(parse_stat("1 )init( S").is_err());
    }

    #[test]
    fn test_non_numeric_field() {
        let line = "1 (init) S x 1 1 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 5";
        assert!(parse_stat(line).is_err());
    }
}
