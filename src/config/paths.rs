//! Default locations: the config file and the swept root directory.

use dirs::config_dir;
use std::path::PathBuf;

use super::CONFIG_ENV;

/// Root swept when no usable override is configured.
#[cfg(windows)]
const DEFAULT_ROOT: &str = r"C:\Scan";
#[cfg(not(windows))]
const DEFAULT_ROOT: &str = "/srv/scan";

pub fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

/// Config file path: `$SAFE_SWEEP_CONFIG` if set, else `<config dir>/safe_sweep/config.xml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }
    if let Some(mut base) = config_dir() {
        base.push("safe_sweep");
        base.push("config.xml");
        Some(base)
    } else {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("safe_sweep")
                .join("config.xml")
        })
    }
}
