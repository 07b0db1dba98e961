//! Exclusive per-file locks.
//!
//! Every candidate is opened for reading and locked before anything is copied, so no
//! other writer (or a second sweeper) can touch it while it is being moved.
//!
//! Design:
//! - Windows: open with share mode 0 (no other handle may read or write) and take
//!   an exclusive LockFileEx lock on top.
//! - Unix: open read-only and take a non-blocking flock(LOCK_EX) through fs2.
//!   Contention surfaces as `WouldBlock`; we never wait for a lock.
//! - Linux: flock is advisory, so `acquire` also takes a write lease. The kernel refuses
//!   it while any other descriptor is open (a depositor still writing), and new opens
//!   by others block or fail with EWOULDBLOCK while it is held.
//! - Where no lease can be had, a file modified within [`QUIET_WINDOW`] is refused.
//!
//! The lock lives as long as the `LockedFile`; dropping or releasing it closes the handle.

use fs2::FileExt;
use rayon::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, trace};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(windows)]
use std::os::windows::fs::OpenOptionsExt;

use crate::errors::SweepError;

use super::helpers::io_hint;

/// Minimum age of the last modification when the kernel cannot enforce exclusion.
pub const QUIET_WINDOW: Duration = Duration::from_secs(5);

/// A candidate file held open under an exclusive lock.
#[derive(Debug)]
pub struct LockedFile {
    path: PathBuf,
    index: usize,
    file: File,
    leased: bool,
}

impl LockedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position of the file in the batch listing.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn handle_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// False once the file was opened elsewhere after the lock was taken.
    pub fn still_exclusive(&self) -> bool {
        #[cfg(unix)]
        {
            !self.leased || crate::platform::write_lease_intact(&self.file)
        }
        #[cfg(not(unix))]
        {
            true
        }
    }

    /// Unlock and close the handle. Returns the path so the caller can act on it.
    pub fn release(self) -> PathBuf {
        let LockedFile {
            path, file, leased, ..
        } = self;
        #[cfg(unix)]
        {
            if leased && let Err(e) = crate::platform::release_write_lease(&file) {
                trace!(path = %path.display(), error = %e, "lease release failed; closing handle");
            }
        }
        #[cfg(not(unix))]
        let _ = leased;
        if let Err(e) = FileExt::unlock(&file) {
            trace!(path = %path.display(), error = %e, "explicit unlock failed; closing handle");
        }
        drop(file);
        trace!(path = %path.display(), "lock released");
        path
    }
}

/// Result of one lock attempt, kept in listing order.
#[derive(Debug)]
pub enum LockAttempt {
    Locked(LockedFile),
    Failed { path: PathBuf, error: SweepError },
}

impl LockAttempt {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockAttempt::Locked(_))
    }
}

fn open_exclusive_read(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true);
    // O_NONBLOCK: fail with EWOULDBLOCK instead of waiting out someone else's lease.
    #[cfg(unix)]
    opts.custom_flags(libc::O_CLOEXEC | libc::O_NOFOLLOW | libc::O_NONBLOCK);
    #[cfg(windows)]
    opts.share_mode(0);
    opts.open(path)
}

/// Open `path` for reading and lock it exclusively without waiting.
/// The returned handle is positioned at offset 0.
pub fn lock_exclusive(path: &Path) -> io::Result<File> {
    let mut file = open_exclusive_read(path)?;
    FileExt::try_lock_exclusive(&file)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Lock a single candidate: exclusive open and flock, plus a write lease where supported.
pub fn acquire(path: &Path, index: usize) -> Result<LockedFile, SweepError> {
    let locked = lock_exclusive(path).and_then(|file| {
        let leased = exclude_writers(&file)?;
        Ok(LockedFile {
            path: path.to_path_buf(),
            index,
            file,
            leased,
        })
    });
    match locked {
        Ok(locked) => {
            debug!(index, path = %path.display(), leased = locked.leased, "locked file");
            Ok(locked)
        }
        Err(source) => Err(SweepError::LockUnavailable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Returns whether a lease now guards the file. Dropping `file` on error releases
/// everything taken so far.
#[cfg(unix)]
fn exclude_writers(file: &File) -> io::Result<bool> {
    use crate::platform::{take_write_lease, Lease};

    match take_write_lease(file)? {
        Lease::Held => Ok(true),
        Lease::Unavailable => {
            ensure_quiet(file, QUIET_WINDOW)?;
            Ok(false)
        }
    }
}

/// Share mode 0 already keeps every other handle out.
#[cfg(not(unix))]
fn exclude_writers(_file: &File) -> io::Result<bool> {
    Ok(false)
}

/// Refuse a file whose last modification is younger than `window` (or in the future).
#[cfg_attr(not(unix), allow(dead_code))]
fn ensure_quiet(file: &File, window: Duration) -> io::Result<()> {
    let modified = file.metadata()?.modified()?;
    let quiet = modified.elapsed().is_ok_and(|age| age >= window);
    if quiet {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            format!(
                "modified within the last {}s and may still be written",
                window.as_secs()
            ),
        ))
    }
}

/// Lock every path concurrently. Each attempt is independent; the returned vector has one
/// entry per input path, in input order, and is only returned once all attempts finished.
pub fn lock_all(paths: &[PathBuf]) -> Vec<LockAttempt> {
    let attempts: Vec<LockAttempt> = paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| match acquire(path, index) {
            Ok(locked) => LockAttempt::Locked(locked),
            Err(error) => LockAttempt::Failed {
                path: path.clone(),
                error,
            },
        })
        .collect();

    // Logged on the calling thread, in listing order, after the barrier.
    for (index, attempt) in attempts.iter().enumerate() {
        if let LockAttempt::Failed { path, error } = attempt {
            let hint = match error {
                SweepError::LockUnavailable { source, .. } => io_hint(source),
                _ => None,
            };
            error!(
                code = error.code(),
                kind = error.kind(),
                index,
                path = %path.display(),
                hint = hint.unwrap_or(""),
                "Failed to lock file: {error}"
            );
        }
    }
    attempts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn second_lock_on_same_file_fails() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("held.txt");
        fs::write(&p, b"x").unwrap();

        let first = acquire(&p, 0).unwrap();
        let err = acquire(&p, 0).unwrap_err();
        assert_eq!(err.kind(), "lock_unavailable");

        first.release();
        assert!(acquire(&p, 0).is_ok(), "lock should be free after release");
    }

    #[test]
    fn missing_file_is_a_lock_failure() {
        let dir = tempdir().unwrap();
        let err = acquire(&dir.path().join("gone.bin"), 3).unwrap_err();
        match err {
            SweepError::LockUnavailable { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn handle_reads_from_start() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("data.txt");
        fs::write(&p, b"payload").unwrap();
        let mut locked = acquire(&p, 0).unwrap();
        let mut s = String::new();
        locked.handle_mut().read_to_string(&mut s).unwrap();
        assert_eq!(s, "payload");
    }

    #[test]
    fn lock_all_keeps_order_and_isolates_failures() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();
        for (i, p) in paths.iter().enumerate() {
            if i != 2 {
                fs::write(p, n_bytes(i)).unwrap();
            }
        }
        let attempts = lock_all(&paths);
        assert_eq!(attempts.len(), 4);
        for (i, a) in attempts.iter().enumerate() {
            match a {
                LockAttempt::Locked(l) => {
                    assert_ne!(i, 2);
                    assert_eq!(l.index(), i);
                    assert_eq!(l.path(), paths[i].as_path());
                }
                LockAttempt::Failed { path, .. } => {
                    assert_eq!(i, 2);
                    assert_eq!(path, &paths[2]);
                }
            }
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn open_writer_blocks_acquire_and_file_is_untouched() {
        use std::io::Write;

        let dir = tempdir().unwrap();
        let p = dir.path().join("incoming.pdf");
        let mut writer = fs::File::create(&p).unwrap();
        writer.write_all(b"first half ").unwrap();

        let err = acquire(&p, 0).unwrap_err();
        match &err {
            SweepError::LockUnavailable { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::WouldBlock)
            }
            other => panic!("unexpected error: {other:?}"),
        }

        writer.write_all(b"second half").unwrap();
        drop(writer);
        assert_eq!(fs::read(&p).unwrap(), b"first half second half");
        let locked = acquire(&p, 0).unwrap();
        assert!(locked.still_exclusive());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn later_open_by_someone_else_is_refused_and_detected() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("held.txt");
        fs::write(&p, b"x").unwrap();

        let locked = acquire(&p, 0).unwrap();
        assert!(locked.leased);
        let err = open_exclusive_read(&p).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(!locked.still_exclusive(), "the refused open starts a lease break");
        locked.release();
        assert!(acquire(&p, 0).is_ok());
    }

    #[test]
    fn recently_modified_file_is_not_quiet() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("fresh.txt");
        fs::write(&p, b"x").unwrap();
        let f = fs::File::open(&p).unwrap();

        let err = ensure_quiet(&f, Duration::from_secs(3600)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(ensure_quiet(&f, Duration::ZERO).is_ok());
    }

    fn n_bytes(n: usize) -> Vec<u8> {
        vec![b'x'; n + 1]
    }
}
