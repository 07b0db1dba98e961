//! Core configuration types.
//! - RawSettings holds option strings exactly as the XML file / CLI supplied them.
//! - Config is the resolved, typed value passed to the sweeper.
//! - LogLevel represents verbosity with simple parsing helpers.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{paths, DEFAULT_SCAN_INTERVAL, LOG_DIR_NAME};

/// Program-defined verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only warnings and errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// Per-file debug events (lock attempts, digests, deletes)
    Debug,
}

impl LogLevel {
    /// Parse common names (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "warn" | "error" => Some(LogLevel::Quiet),
            "normal" | "info" => Some(LogLevel::Normal),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Debug => "debug",
        })
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Unresolved option strings. Later sources overwrite earlier ones via [`RawSettings::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub root_path: Option<String>,
    pub override_date: Option<String>,
    pub scan_interval: Option<String>,
    pub debug: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

impl RawSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(mut self, other: RawSettings) -> Self {
        macro_rules! take {
            ($($f:ident),*) => { $( if other.$f.is_some() { self.$f = other.$f; } )* };
        }
        take!(root_path, override_date, scan_interval, debug, log_level, log_dir);
        self
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that is scanned (non-recursively) and that holds the dated folders
    pub root: PathBuf,
    /// Fixed destination date; None means "today in Central European time" at each tick
    pub date_override: Option<NaiveDate>,
    /// Delay between ticks
    pub scan_interval: Duration,
    pub log_level: LogLevel,
    /// Directory for log files; None means `{root}/log`
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Config with explicit root and defaults elsewhere. Used by tests and embedders.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.root.join(LOG_DIR_NAME))
    }

    pub fn debug(&self) -> bool {
        self.log_level == LogLevel::Debug
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: paths::default_root(),
            date_override: None,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            log_level: LogLevel::Normal,
            log_dir: None,
        }
    }
}

/// Result of resolving RawSettings: the config plus notes about rejected values.
/// Notes are logged by the caller once tracing is up.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: Config,
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_source() {
        let xml = RawSettings {
            root_path: Some("/from/xml".into()),
            scan_interval: Some("20000".into()),
            ..Default::default()
        };
        let cli = RawSettings {
            root_path: Some("/from/cli".into()),
            debug: Some("true".into()),
            ..Default::default()
        };
        let merged = xml.merge(cli);
        assert_eq!(merged.root_path.as_deref(), Some("/from/cli"));
        assert_eq!(merged.scan_interval.as_deref(), Some("20000"));
        assert_eq!(merged.debug.as_deref(), Some("true"));
    }

    #[test]
    fn log_level_parse_and_display() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Normal));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Quiet.to_string(), "quiet");
    }

    #[test]
    fn log_dir_defaults_under_root() {
        let cfg = Config::new("/data/drop");
        assert_eq!(cfg.effective_log_dir(), PathBuf::from("/data/drop/log"));
    }
}
