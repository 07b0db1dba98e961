//! Configuration: types, default paths, XML loading, sentinel parsing and resolution.
//!
//! Values arrive as raw strings (XML file, then CLI overrides) and are resolved once
//! into a [`Config`] that is handed to the sweeper. Nothing here is process-global.

pub mod paths;
pub mod sentinel;
pub mod types;
mod validate;
pub mod xml;

use std::time::Duration;

pub use paths::{default_config_path, default_root};
pub use types::{Config, LogLevel, RawSettings, Resolved};
pub use validate::{preview, preview_with_default_root, resolve, resolve_with_default_root};
pub use xml::{create_template_config, load_or_init, load_raw_from_path, LoadResult};

/// Scan interval used when none (or an invalid one) is configured.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(30_000);
/// Shortest accepted scan interval; anything lower falls back to the default.
pub const MIN_SCAN_INTERVAL_MS: u64 = 10_000;
/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "SAFE_SWEEP_CONFIG";
/// Name of the log directory created inside the root when no `log_dir` is set.
pub const LOG_DIR_NAME: &str = "log";
