//! Parsing of raw option strings.
//!
//! Operators write `false` (any case) to mean "use the default", so every option
//! goes through these helpers before it becomes a typed value.

use std::path::PathBuf;
use std::time::Duration;

use super::{DEFAULT_SCAN_INTERVAL, MIN_SCAN_INTERVAL_MS};

/// True for empty values and any casing of `false`.
pub fn means_default(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t.eq_ignore_ascii_case("false")
}

/// Requested root path, or None when the value asks for the default.
pub fn root_override(raw: Option<&str>) -> Option<PathBuf> {
    raw.filter(|s| !means_default(s))
        .map(|s| PathBuf::from(s.trim()))
}

/// Scan interval in milliseconds.
/// Non-numeric, zero/negative, sentinel, or below the 10 s minimum -> 30 s default.
pub fn scan_interval(raw: Option<&str>) -> Duration {
    let Some(s) = raw.filter(|s| !means_default(s)) else {
        return DEFAULT_SCAN_INTERVAL;
    };
    match s.trim().parse::<u64>() {
        Ok(ms) if ms >= MIN_SCAN_INTERVAL_MS => Duration::from_millis(ms),
        _ => DEFAULT_SCAN_INTERVAL,
    }
}

/// Debug flag: only `true` in any casing enables it.
pub fn debug_flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|s| s.trim().eq_ignore_ascii_case("true"))
}
