//! XML configuration support.
//! - Loads raw option strings from config.xml (quick_xml + serde).
//! - Writes a commented template on first run when the default location is empty.
//!
//! Notes:
//! - Values are kept as strings here; sentinel handling happens during resolution.
//! - Unknown elements are rejected so a misspelt option is not silently ignored.

use anyhow::{anyhow, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::default_config_path;
use super::types::RawSettings;
use super::{CONFIG_ENV, DEFAULT_SCAN_INTERVAL};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Mirror of the `<config>` document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    root_path: Option<String>,
    override_date: Option<String>,
    scan_interval: Option<String>,
    debug: Option<String>,
    log_level: Option<String>,
    log_dir: Option<String>,
}

impl From<XmlConfig> for RawSettings {
    fn from(x: XmlConfig) -> Self {
        RawSettings {
            root_path: x.root_path,
            override_date: x.override_date,
            scan_interval: x.scan_interval,
            debug: x.debug,
            log_level: x.log_level,
            log_dir: x.log_dir,
        }
    }
}

/// Outcome of looking for a config file.
#[derive(Debug)]
pub enum LoadResult {
    /// File found and parsed.
    Loaded(PathBuf, RawSettings),
    /// No file at the default location; a template was written there. Defaults apply.
    CreatedTemplate(PathBuf),
    /// No file and no template could be written. Defaults apply.
    Missing,
}

impl LoadResult {
    pub fn into_raw(self) -> RawSettings {
        match self {
            LoadResult::Loaded(_, raw) => raw,
            LoadResult::CreatedTemplate(_) | LoadResult::Missing => RawSettings::default(),
        }
    }
}

/// Parse one XML config file.
pub fn load_raw_from_path(path: &Path) -> Result<RawSettings> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(RawSettings::default());
    }
    let parsed: XmlConfig = from_xml_str(&contents).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("unknown field") {
            anyhow!("Unknown field in config {}: {}. Refusing to start.", path.display(), msg)
        } else {
            anyhow!("parse config xml '{}': {}", path.display(), msg)
        }
    })?;
    Ok(parsed.into())
}

/// Load the config from `explicit` (CLI flag) or `$SAFE_SWEEP_CONFIG`; both must exist.
/// Otherwise use the default location, writing a template there if it is missing.
pub fn load_or_init(explicit: Option<&Path>) -> Result<LoadResult> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));

    if let Some(path) = explicit {
        let raw = load_raw_from_path(&path)?;
        return Ok(LoadResult::Loaded(path, raw));
    }

    let Some(path) = default_config_path() else {
        return Ok(LoadResult::Missing);
    };
    if path.exists() {
        let raw = load_raw_from_path(&path)?;
        return Ok(LoadResult::Loaded(path, raw));
    }
    match create_template_config(&path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(path)),
        Err(_) => Ok(LoadResult::Missing),
    }
}

/// Write the commented template (0600; parent dir 0700 on Unix).
pub fn create_template_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir '{}'", parent.display()))?;
        let _ = set_dir_mode_0700(parent);
    }

    let content = format!(
        "<!--\n  safe_sweep configuration (XML)\n\n    root_path      -> directory to sweep; \"false\" or empty uses the default\n    override_date  -> destination folder as yyyyMMdd; empty uses today's date (Central European time)\n    scan_interval  -> milliseconds between sweeps; minimum 10000, \"false\" uses the default\n    debug          -> true enables debug logging and the debug log file\n    log_level      -> quiet | normal | debug (ignored when debug is true)\n    log_dir        -> directory for log files; empty uses <root_path>/log\n\n  CLI flags override values in this file.\n-->\n<config>\n  <root_path>false</root_path>\n  <override_date></override_date>\n  <scan_interval>{}</scan_interval>\n  <debug>false</debug>\n  <log_level>normal</log_level>\n  <log_dir></log_dir>\n</config>\n",
        DEFAULT_SCAN_INTERVAL.as_millis()
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
