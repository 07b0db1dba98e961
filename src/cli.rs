//! CLI definition and parsing.
//! Defines Args and converts the flags into RawSettings overrides.
//!
//! Notes:
//! - Flags use the same sentinel rules as the XML file ("false" or empty means default).
//! - --debug is a shorthand for `debug = true` and wins over --log-level.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::RawSettings;

/// Sweep files from a drop directory into dated folders, verified by SHA-256.
/// CLI flags override values from the XML config file.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Lock, copy, verify and delete files from a drop directory into dated folders"
)]
pub struct Args {
    /// Config file to read (overrides SAFE_SWEEP_CONFIG and the default location).
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory to sweep; "false" uses the default root.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<String>,

    /// Destination folder name as yyyyMMdd instead of today's date.
    #[arg(long, value_name = "yyyyMMdd")]
    pub date: Option<String>,

    /// Milliseconds between sweeps (minimum 10000).
    #[arg(long, value_name = "MS")]
    pub interval: Option<String>,

    /// Enable debug logging and the debug log file name.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Set log level: quiet, normal, debug.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for log files (default: <root>/log).
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub log_dir: Option<String>,

    /// Emit logs in structured JSON.
    #[arg(long)]
    pub json: bool,

    /// Run a single sweep and exit.
    #[arg(long)]
    pub once: bool,

    /// Print the config file location and the effective settings, then exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Flags as a RawSettings layer; unset flags stay None so the file value survives.
    pub fn overrides(&self) -> RawSettings {
        RawSettings {
            root_path: self.root.clone(),
            override_date: self.date.clone(),
            scan_interval: self.interval.clone(),
            debug: self.debug.then(|| "true".to_string()),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
