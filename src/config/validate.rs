//! Resolution of RawSettings into a Config.
//! Picks the root (creating the default when needed), verifies it is readable and writable,
//! and applies the sentinel rules to the date, interval and logging options.
//! `preview` applies the same rules without touching the filesystem.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::folder::parse_override_date;

use super::paths::default_root;
use super::sentinel;
use super::types::{Config, LogLevel, RawSettings, Resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Create the default root and probe it.
    Prepare,
    /// Read-only: nothing is created or written.
    Preview,
}

/// Resolve using the platform default root as the fallback.
pub fn resolve(raw: &RawSettings) -> Result<Resolved> {
    resolve_with_default_root(raw, &default_root())
}

/// Resolve with an explicit fallback root (lets tests avoid touching system paths).
pub fn resolve_with_default_root(raw: &RawSettings, fallback: &Path) -> Result<Resolved> {
    resolve_in(raw, fallback, Mode::Prepare)
}

/// Like [`resolve`], but never creates the default root and skips the write probe.
pub fn preview(raw: &RawSettings) -> Result<Resolved> {
    preview_with_default_root(raw, &default_root())
}

pub fn preview_with_default_root(raw: &RawSettings, fallback: &Path) -> Result<Resolved> {
    resolve_in(raw, fallback, Mode::Preview)
}

fn resolve_in(raw: &RawSettings, fallback: &Path, mode: Mode) -> Result<Resolved> {
    let mut notes = Vec::new();

    let root = match sentinel::root_override(raw.root_path.as_deref()) {
        Some(p) if p.is_dir() => p,
        Some(p) => {
            notes.push(format!(
                "root_path '{}' is not an existing directory; using default '{}'",
                p.display(),
                fallback.display()
            ));
            ensure_default_root(fallback, mode, &mut notes)?
        }
        None => ensure_default_root(fallback, mode, &mut notes)?,
    };
    let root = dunce::canonicalize(&root).unwrap_or(root);
    if root.is_dir() {
        ensure_readable(&root)?;
    }
    if mode == Mode::Prepare {
        ensure_writable(&root)?;
    }

    let date_override = match raw.override_date.as_deref() {
        Some(s) if !sentinel::means_default(s) => {
            let parsed = parse_override_date(s);
            if parsed.is_none() {
                notes.push(format!(
                    "override_date '{}' is not a valid yyyyMMdd date; using today's date",
                    s.trim()
                ));
            }
            parsed
        }
        _ => None,
    };

    let scan_interval = sentinel::scan_interval(raw.scan_interval.as_deref());
    if let Some(s) = raw.scan_interval.as_deref()
        && !sentinel::means_default(s)
        && s.trim().parse::<u64>().ok() != Some(scan_interval.as_millis() as u64)
    {
        notes.push(format!(
            "scan_interval '{}' rejected (minimum 10000 ms); using {} ms",
            s.trim(),
            scan_interval.as_millis()
        ));
    }

    let log_level = if sentinel::debug_flag(raw.debug.as_deref()) {
        LogLevel::Debug
    } else {
        raw.log_level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or_default()
    };

    let log_dir = raw
        .log_dir
        .as_deref()
        .filter(|s| !sentinel::means_default(s))
        .map(|s| PathBuf::from(s.trim()));

    Ok(Resolved {
        config: Config {
            root,
            date_override,
            scan_interval,
            log_level,
            log_dir,
        },
        notes,
    })
}

/// Create the fallback root if missing; it must end up a directory.
fn ensure_default_root(path: &Path, mode: Mode, notes: &mut Vec<String>) -> Result<PathBuf> {
    if path.exists() {
        if !path.is_dir() {
            bail!("default root exists but isn't a directory: {}", path.display());
        }
    } else if mode == Mode::Preview {
        notes.push(format!(
            "default root '{}' does not exist yet; it is created on start",
            path.display()
        ));
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create default root '{}'", path.display()))?;
    }
    Ok(path.to_path_buf())
}

fn ensure_readable(path: &Path) -> Result<()> {
    fs::read_dir(path).with_context(|| {
        format!("Cannot read root directory '{}'; check permissions", path.display())
    })?;
    debug!(root = %path.display(), "root readable");
    Ok(())
}

/// Create and remove a hidden directory. Dated folders are created the same way, and the
/// listing only takes regular files, so a concurrent sweep never picks the probe up.
fn ensure_writable(path: &Path) -> Result<()> {
    let probe = path.join(format!(".safe_sweep_probe_{}", std::process::id()));
    fs::create_dir(&probe).with_context(|| {
        format!("Cannot write to root '{}'; check permissions", path.display())
    })?;
    if let Err(e) = fs::remove_dir(&probe) {
        debug!(probe = %probe.display(), error = %e, "could not remove write probe");
    }
    debug!(root = %path.display(), "root writable");
    Ok(())
}
