//! Streaming copy from a locked source handle into a brand-new destination file.
//!
//! Features:
//! - Destination is created with `create_new` (O_EXCL semantics); an existing file is a
//!   collision and is never clobbered.
//! - Linux: in-kernel `copy_file_range` in 16 MiB chunks, falling back to buffered
//!   1 MiB read/write when it refuses the pair of files before copying anything.
//! - The shutdown flag is checked between chunks; an interrupted or failed copy removes
//!   the partial destination before returning.
//! - The destination is flushed and `sync_all`ed, then closed, before this returns, so
//!   verification always reads durable bytes through a fresh handle.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::error;

use crate::errors::SweepError;
use crate::shutdown;

const BUF_SIZE: usize = 1024 * 1024;

/// Instrumentation for one copy.
#[derive(Debug, Clone, Copy)]
pub struct CopyStats {
    /// Total bytes copied from source to destination.
    pub bytes: u64,
    /// Whether the kernel fast path did the copy.
    pub in_kernel: bool,
}

/// Copy the whole of `src` (rewound to offset 0) into a new file at `dst`.
pub(super) fn copy_into_new(
    src: &mut File,
    src_path: &Path,
    dst: &Path,
) -> Result<CopyStats, SweepError> {
    src.seek(SeekFrom::Start(0))
        .map_err(SweepError::io("rewind source", src_path))?;

    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_FLAG_WRITE_THROUGH: u32 = 0x8000_0000;
        opts.custom_flags(FILE_FLAG_WRITE_THROUGH);
    }

    let dst_f = match opts.open(dst) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(SweepError::Collision(dst.to_path_buf()));
        }
        Err(e) => return Err(SweepError::io("create destination", dst)(e)),
    };

    let result = copy_and_sync(src, src_path, dst_f, dst);
    // Only this run created dst (create_new above), so removing it cannot hit someone else's file.
    if result.is_err()
        && let Err(e) = fs::remove_file(dst)
    {
        error!(path = %dst.display(), error = %e, "Failed to remove partial copy");
    }
    result
}

fn copy_and_sync(
    src: &mut File,
    src_path: &Path,
    dst_f: File,
    dst: &Path,
) -> Result<CopyStats, SweepError> {
    #[cfg(target_os = "linux")]
    let (dst_f, kernel_bytes) = {
        let copied = copy_in_kernel(src, &dst_f, dst)?;
        (dst_f, copied)
    };
    #[cfg(not(target_os = "linux"))]
    let kernel_bytes: Option<u64> = None;

    if let Some(bytes) = kernel_bytes {
        dst_f.sync_all().map_err(SweepError::io("fsync destination", dst))?;
        drop(dst_f);
        return Ok(CopyStats { bytes, in_kernel: true });
    }

    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut bytes: u64 = 0;
    loop {
        if shutdown::is_requested() {
            return Err(SweepError::Interrupted);
        }
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SweepError::io("read source", src_path)(e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(SweepError::io("write destination", dst))?;
        bytes += n as u64;
    }
    writer.flush().map_err(SweepError::io("flush destination", dst))?;
    let dst_f = writer
        .into_inner()
        .map_err(|e| SweepError::io("flush destination", dst)(e.into_error()))?;
    dst_f.sync_all().map_err(SweepError::io("fsync destination", dst))?;
    drop(dst_f);
    Ok(CopyStats { bytes, in_kernel: false })
}

/// Returns Ok(None) when copy_file_range is unsupported here and nothing was copied yet.
#[cfg(target_os = "linux")]
fn copy_in_kernel(src: &File, dst_f: &File, dst: &Path) -> Result<Option<u64>, SweepError> {
    use std::os::unix::io::AsRawFd;

    const CHUNK: usize = 16 * 1024 * 1024;
    let mut total: u64 = 0;
    loop {
        if shutdown::is_requested() {
            return Err(SweepError::Interrupted);
        }
        // SAFETY: both fds stay open for the call; null offsets use the file positions.
        let rc = unsafe {
            libc::copy_file_range(
                src.as_raw_fd(),
                std::ptr::null_mut(),
                dst_f.as_raw_fd(),
                std::ptr::null_mut(),
                CHUNK,
                0,
            )
        };
        if rc > 0 {
            total += rc as u64;
            continue;
        }
        if rc == 0 {
            return Ok(Some(total));
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            continue;
        }
        let unsupported = matches!(
            err.raw_os_error(),
            Some(code) if code == libc::EXDEV
                || code == libc::EBADF
                || code == libc::ENOSYS
                || code == libc::EINVAL
                || code == libc::EPERM
                || code == libc::EOPNOTSUPP
        );
        if total == 0 && unsupported {
            return Ok(None);
        }
        return Err(SweepError::io("copy_file_range", dst)(err));
    }
}
