//! Scoped Win32 handles
//!
//! Process and token handles are closed when their owner drops, so every early
//! return in the readers below releases what it opened.

use crate::source::{ReadError, ReadResult};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Security::{
    GetTokenInformation, LookupAccountSidW, TokenUser, SID_NAME_USE, TOKEN_QUERY, TOKEN_USER,
};
use windows::Win32::System::Threading::{
    OpenProcess, OpenProcessToken, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

/// Longest NT path plus terminator
const IMAGE_PATH_MAX: usize = 32_768;
const ACCOUNT_NAME_MAX: usize = 256;

/// Handle closed on drop
#[derive(Debug)]
struct OwnedHandle(HANDLE);

impl OwnedHandle {
    fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            // SAFETY: the handle was returned by a successful open call and is
            // closed exactly once
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

fn win_error(call: &str, err: windows::core::Error) -> ReadError {
    ReadError::Unavailable(format!("{}: {}", call, err))
}

/// Read-only process handle (`PROCESS_QUERY_LIMITED_INFORMATION`)
#[derive(Debug)]
pub struct ProcessHandle {
    handle: OwnedHandle,
}

impl ProcessHandle {
    /// Open `pid` for limited queries; fails on access denied or exited processes
    pub fn open(pid: u32) -> ReadResult<Self> {
        // SAFETY: plain FFI call, the result is owned immediately
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map_err(|e| win_error("OpenProcess", e))?;
        Ok(Self {
            handle: OwnedHandle(handle),
        })
    }

    /// Full Win32 path of the executable image
    pub fn image_path(&self) -> ReadResult<String> {
        let mut buf = vec![0u16; IMAGE_PATH_MAX];
        let mut len = buf.len() as u32;
        // SAFETY: buf outlives the call and len holds its capacity
        unsafe {
            QueryFullProcessImageNameW(
                self.handle.raw(),
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut len,
            )
        }
        .map_err(|e| win_error("QueryFullProcessImageNameW", e))?;

        Ok(String::from_utf16_lossy(&buf[..len as usize]))
    }

    /// Account name of the token user
    pub fn owner(&self) -> ReadResult<String> {
        let mut raw_token = HANDLE::default();
        // SAFETY: raw_token is a valid out pointer
        unsafe { OpenProcessToken(self.handle.raw(), TOKEN_QUERY, &mut raw_token) }
            .map_err(|e| win_error("OpenProcessToken", e))?;
        let token = OwnedHandle(raw_token);

        // first call only reports the buffer size and always fails
        let mut needed = 0u32;
        // SAFETY: a null buffer with zero length is the documented size query
        let _ = unsafe { GetTokenInformation(token.raw(), TokenUser, None, 0, &mut needed) };
        if needed == 0 {
            return Err(ReadError::Unavailable(
                "GetTokenInformation reported an empty TokenUser".to_string(),
            ));
        }

        // u64 storage keeps TOKEN_USER (and the SID pointer in it) aligned
        let words = (needed as usize).div_ceil(std::mem::size_of::<u64>());
        let mut info = vec![0u64; words];
        // SAFETY: info holds at least `needed` bytes
        unsafe {
            GetTokenInformation(
                token.raw(),
                TokenUser,
                Some(info.as_mut_ptr().cast()),
                needed,
                &mut needed,
            )
        }
        .map_err(|e| win_error("GetTokenInformation", e))?;

        // SAFETY: the kernel wrote a TOKEN_USER at the start of an aligned buffer
        let token_user = unsafe { &*(info.as_ptr() as *const TOKEN_USER) };

        let mut name = [0u16; ACCOUNT_NAME_MAX];
        let mut name_len = name.len() as u32;
        let mut domain = [0u16; ACCOUNT_NAME_MAX];
        let mut domain_len = domain.len() as u32;
        let mut sid_type = SID_NAME_USE::default();
        // SAFETY: the SID points into `info`, which is alive; buffers carry
        // their capacities
        unsafe {
            LookupAccountSidW(
                PCWSTR::null(),
                token_user.User.Sid,
                PWSTR(name.as_mut_ptr()),
                &mut name_len,
                PWSTR(domain.as_mut_ptr()),
                &mut domain_len,
                &mut sid_type,
            )
        }
        .map_err(|e| win_error("LookupAccountSidW", e))?;

        Ok(String::from_utf16_lossy(&name[..name_len as usize]))
    }
}
