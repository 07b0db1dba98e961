//! I/O error hints.
//!
//! Maps raw OS codes (falling back to `ErrorKind`) to a short operator-facing hint that
//! is attached to error log events as the `hint` field.

use std::io;

/// Short actionable hint for an io::Error, if one applies.
pub fn io_hint(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error()
        && let Some(hint) = os_hint(code)
    {
        return Some(hint);
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("permission denied; check ownership and permissions")
        }
        io::ErrorKind::NotFound => Some("file vanished before it could be locked"),
        io::ErrorKind::AlreadyExists => Some("destination name already taken"),
        io::ErrorKind::WouldBlock => Some("file is locked by another process; retried next sweep"),
        _ => None,
    }
}

#[cfg(unix)]
fn os_hint(code: i32) -> Option<&'static str> {
    #[allow(unreachable_patterns)]
    match code {
        libc::EWOULDBLOCK | libc::EAGAIN => {
            Some("file is locked by another process; retried next sweep")
        }
        libc::EACCES | libc::EPERM => Some("permission denied; check ownership and permissions"),
        libc::ENOENT => Some("file vanished before it could be locked"),
        libc::EEXIST => Some("destination name already taken"),
        libc::ENOSPC => Some("destination filesystem is full"),
        libc::EROFS => Some("destination is on a read-only filesystem"),
        libc::ELOOP => Some("path is a symlink; only regular files are swept"),
        libc::EMFILE | libc::ENFILE => Some("too many open files; raise the descriptor limit"),
        libc::EIO => Some("device I/O error; check the disk"),
        _ => None,
    }
}

#[cfg(windows)]
fn os_hint(code: i32) -> Option<&'static str> {
    match code {
        // ERROR_ACCESS_DENIED
        5 => Some("access denied; check permissions"),
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        32 | 33 => Some("file is in use by another process; retried next sweep"),
        // ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND
        2 | 3 => Some("file vanished before it could be locked"),
        // ERROR_FILE_EXISTS
        80 => Some("destination name already taken"),
        // ERROR_DISK_FULL
        112 => Some("destination disk is full"),
        // ERROR_WRITE_PROTECT
        19 => Some("destination is write protected"),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn os_hint(_code: i32) -> Option<&'static str> {
    None
}
