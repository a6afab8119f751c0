//! Common platform utilities

use crate::source::{ReadError, ReadResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read file contents as string, trimming whitespace
pub fn read_file_string<P: AsRef<Path>>(path: P) -> ReadResult<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

/// Read at most `cap` bytes of a file
///
/// Pseudo-files report a size of zero, so this reads until EOF or the cap,
/// whichever comes first. Content beyond the cap is dropped.
pub fn read_file_capped<P: AsRef<Path>>(path: P, cap: usize) -> ReadResult<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(cap.min(4096));
    file.take(cap as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Parse the first whitespace-separated token of a file as f64
pub fn read_first_f64<P: AsRef<Path>>(path: P) -> ReadResult<f64> {
    let content = read_file_string(path)?;
    let token = content
        .split_whitespace()
        .next()
        .ok_or_else(|| ReadError::Malformed("empty file".to_string()))?;
    token
        .parse()
        .map_err(|e| ReadError::Malformed(format!("Failed to parse f64 {:?}: {}", token, e)))
}

/// Final component of a path, or the whole string if it has none
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
