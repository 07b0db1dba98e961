//! Copy, verify, then delete: the per-file move.
//!
//! Order matters and is the whole point of this module:
//! 1. digest the locked source
//! 2. refuse if the destination name is taken
//! 3. copy into a new file, fsync, close
//! 4. reopen the copy under an exclusive lock and digest it
//! 5. on mismatch remove the copy and keep the source
//! 6. if someone else opened the source meanwhile, remove the copy and keep the source
//! 7. otherwise release the source lock, then delete the source
//!
//! Every failure releases the source lock and leaves the source file in place. The one
//! exception to "no copy left behind" is a source that cannot be deleted: the verified
//! copy stays and the next sweep copies the source again.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::errors::SweepError;

use super::hash::{digests_match, ContentHasher};
use super::io_copy::copy_into_new;
use super::lock::{lock_exclusive, LockedFile};
use super::space::ensure_space_for_copy;

/// What happened to one file. Only feeds the batch tally; not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Moved(PathBuf),
    LockFailed,
    Collision,
    DigestMismatch,
    /// Any other I/O failure, lack of space or interruption; handled like a mismatch.
    Failed,
}

impl CopyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CopyOutcome::Moved(_))
    }
}

impl From<&SweepError> for CopyOutcome {
    fn from(e: &SweepError) -> Self {
        match e {
            SweepError::LockUnavailable { .. } => CopyOutcome::LockFailed,
            SweepError::Collision(_) => CopyOutcome::Collision,
            SweepError::DigestMismatch { .. } => CopyOutcome::DigestMismatch,
            SweepError::InsufficientSpace { .. }
            | SweepError::Io { .. }
            | SweepError::Interrupted => CopyOutcome::Failed,
        }
    }
}

/// `{timestamp + index}` plus the source's extension (with its dot), if any.
pub fn destination_name(src: &Path, timestamp: i64, index: usize) -> OsString {
    let stamp = timestamp.saturating_add(index as i64);
    let mut name = OsString::from(stamp.to_string());
    if let Some(ext) = src.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Move one locked file into `dest_dir`, verified by `hasher`. Returns the destination path.
pub fn copy_verify_delete(
    mut locked: LockedFile,
    dest_dir: &Path,
    timestamp: i64,
    hasher: &dyn ContentHasher,
) -> Result<PathBuf, SweepError> {
    let dest = dest_dir.join(destination_name(locked.path(), timestamp, locked.index()));

    if let Err(e) = transfer(&mut locked, dest_dir, &dest, hasher) {
        locked.release();
        return Err(e);
    }

    info!(
        src = %locked.path().display(),
        dest = %dest.display(),
        "Copy operation success"
    );

    // The lock must be gone before deletion; some platforms refuse to delete an open file.
    let src = locked.release();
    if let Err(e) = fs::remove_file(&src) {
        warn!(
            src = %src.display(),
            dest = %dest.display(),
            error = %e,
            "Verified copy kept but original not deleted; the next sweep copies it again"
        );
        return Err(SweepError::io("remove original", &src)(e));
    }
    debug!(path = %src.display(), "Deleted original");
    Ok(dest)
}

fn transfer(
    locked: &mut LockedFile,
    dest_dir: &Path,
    dest: &Path,
    hasher: &dyn ContentHasher,
) -> Result<(), SweepError> {
    let src = locked.path().to_path_buf();

    let expected = hasher
        .digest(locked.handle_mut())
        .map_err(SweepError::io("hash source", &src))?;
    debug!(
        path = %src.display(),
        algorithm = hasher.algorithm(),
        digest = %expected,
        "source digest computed"
    );

    // symlink_metadata so a dangling link at the destination also counts as taken.
    if fs::symlink_metadata(dest).is_ok() {
        return Err(SweepError::Collision(dest.to_path_buf()));
    }

    let len = locked
        .handle_mut()
        .metadata()
        .map_err(SweepError::io("stat source", &src))?
        .len();
    ensure_space_for_copy(dest_dir, len)?;

    debug!(src = %src.display(), dest = %dest.display(), "Attempting copy operation");
    let stats = copy_into_new(locked.handle_mut(), &src, dest)?;
    debug!(
        dest = %dest.display(),
        bytes = stats.bytes,
        in_kernel = stats.in_kernel,
        "copy written and synced"
    );

    let actual = match digest_of_copy(dest, hasher) {
        Ok(d) => d,
        Err(e) => {
            discard_copy(dest);
            return Err(e);
        }
    };
    debug!(path = %dest.display(), digest = %actual, "copy digest computed");

    if !digests_match(&expected, &actual) {
        discard_copy(dest);
        return Err(SweepError::DigestMismatch {
            dest: dest.to_path_buf(),
            expected,
            actual,
        });
    }

    if !locked.still_exclusive() {
        discard_copy(dest);
        return Err(SweepError::LockUnavailable {
            path: src,
            source: io::Error::new(
                io::ErrorKind::WouldBlock,
                "opened by another process during the copy",
            ),
        });
    }
    Ok(())
}

/// Reopen the finished copy under an exclusive lock and hash it from disk.
fn digest_of_copy(dest: &Path, hasher: &dyn ContentHasher) -> Result<String, SweepError> {
    let mut f = lock_exclusive(dest).map_err(SweepError::io("reopen destination", dest))?;
    hasher
        .digest(&mut f)
        .map_err(SweepError::io("hash destination", dest))
}

fn discard_copy(dest: &Path) {
    if let Err(e) = fs::remove_file(dest) {
        error!(path = %dest.display(), error = %e, "Failed to remove unverified copy");
    }
}
