use std::path::Path;

use crate::errors::SweepError;
use crate::platform::available_space;

/// Headroom kept free on the destination filesystem on top of the file itself.
const CUSHION: u64 = 4 * 1024 * 1024;

pub(super) fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{n} B")
    }
}

/// Fail before creating anything if `dst_dir` cannot hold `required` bytes plus the cushion.
pub(super) fn ensure_space_for_copy(dst_dir: &Path, required: u64) -> Result<(), SweepError> {
    let available = available_space(dst_dir)
        .map_err(SweepError::io("stat destination filesystem", dst_dir))?;
    if available < required.saturating_add(CUSHION) {
        tracing::warn!(
            dest = %dst_dir.display(),
            need = %format_bytes(required),
            free = %format_bytes(available),
            "not enough free space for copy"
        );
        return Err(SweepError::InsufficientSpace {
            required,
            available,
            dest: dst_dir.to_path_buf(),
        });
    }
    Ok(())
}
