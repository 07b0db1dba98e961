//! Unix implementations of platform helpers.

use super::common_unix::atomic_write_0600;
use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

/// Open a log file for appending; 0600 is applied only when the file is created,
/// so an administrator's later chmod (e.g. group-readable for shipping) survives restarts.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
}

/// Write the config template atomically with mode 0600.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write_0600(path, contents)
}

/// chmod 0700 for the config directory.
pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

/// Bytes available to unprivileged users on the filesystem holding `path` (statvfs).
pub fn available_space(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))?;
    let mut stat: MaybeUninit<libc::statvfs> = MaybeUninit::uninit();
    // SAFETY: c_path is a valid NUL-terminated string and stat points to writable memory.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: statvfs returned 0 so the struct is initialized.
    let stat = unsafe { stat.assume_init() };
    #[allow(clippy::unnecessary_cast)]
    Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

/// Result of asking the kernel for a write lease on an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lease {
    Held,
    /// Leases are not available for this file (other Unix, foreign owner, unsupported fs).
    Unavailable,
}

/// Take an `F_WRLCK` lease. The kernel refuses it with EAGAIN (`WouldBlock`) while any
/// other descriptor for the file is open, including writers that hold no flock.
#[cfg(target_os = "linux")]
pub fn take_write_lease(file: &File) -> io::Result<Lease> {
    use std::os::unix::io::AsRawFd;

    ignore_lease_break_signal();
    // SAFETY: the fd is owned by `file` and stays open for the duration of the call.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLEASE, libc::F_WRLCK) };
    if rc == 0 {
        return Ok(Lease::Held);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EACCES | libc::EINVAL | libc::ENOSYS | libc::ENOLCK) => Ok(Lease::Unavailable),
        _ => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn take_write_lease(_file: &File) -> io::Result<Lease> {
    Ok(Lease::Unavailable)
}

/// False once another open has started breaking the lease.
#[cfg(target_os = "linux")]
pub fn write_lease_intact(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;

    // SAFETY: see take_write_lease.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETLEASE) };
    rc == libc::F_WRLCK
}

#[cfg(not(target_os = "linux"))]
pub fn write_lease_intact(_file: &File) -> bool {
    true
}

#[cfg(target_os = "linux")]
pub fn release_write_lease(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: see take_write_lease.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLEASE, libc::F_UNLCK) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn release_write_lease(_file: &File) -> io::Result<()> {
    Ok(())
}

/// A lease break is signalled with SIGIO, whose default action terminates the process.
/// Breaks are detected with F_GETLEASE instead.
#[cfg(target_os = "linux")]
fn ignore_lease_break_signal() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        // SAFETY: installing SIG_IGN has no handler code to run.
        unsafe {
            libc::signal(libc::SIGIO, libc::SIG_IGN);
        }
    });
}
