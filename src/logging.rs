//! Tracing initialization.
//! Builds a registry with an EnvFilter and up to three fmt layers:
//! - stdout (compact or JSON)
//! - `{log_dir}/sweep.YYYY-MM-DD.log`, rolled daily (`sweep_debug.*` in debug mode)
//! - `{log_dir}/errors.log`, warnings and errors only
//!
//! File writers go through tracing_appender::non_blocking; the returned guards must be
//! held until exit so buffered lines are flushed.

use anyhow::{Context, Result};
use chrono::Local;
use safe_sweep::output as out;
use safe_sweep::platform::{open_log_file_secure_append, set_dir_mode_0700};
use safe_sweep::LogLevel;
use std::fmt as stdfmt;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{registry, Layer};

const ERROR_LOG_NAME: &str = "errors.log";

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync + 'static>;

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%d/%m/%y %H:%M:%S"))
    }
}

#[inline]
fn to_level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::WARN,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
    }
}

#[inline]
fn env_filter_from_level(level_filter: LevelFilter) -> EnvFilter {
    let level_str = match level_filter {
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
        _ => "info",
    };
    EnvFilter::new(level_str)
}

/// Rolling log file prefix; debug runs write to a separate file set.
#[inline]
fn rolling_prefix(lvl: LogLevel) -> &'static str {
    if lvl == LogLevel::Debug {
        "sweep_debug"
    } else {
        "sweep"
    }
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        tsfmt::layer()
            .json()
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed()
    } else {
        tsfmt::layer()
            .compact()
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}

/// Create the log directory; refuse a symlinked one.
fn prepare_log_dir(dir: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(dir)
        && meta.file_type().is_symlink()
    {
        anyhow::bail!("log directory {} is a symlink", dir.display());
    }
    fs::create_dir_all(dir).with_context(|| format!("create log dir '{}'", dir.display()))?;
    let _ = set_dir_mode_0700(dir);
    Ok(())
}

/// File layers for `dir`. On failure prints a warning and returns what could be opened.
fn file_layers(
    dir: &Path,
    lvl: LogLevel,
    json: bool,
    guards: &mut Vec<WorkerGuard>,
) -> Vec<BoxedLayer> {
    let mut layers = Vec::new();
    if let Err(e) = prepare_log_dir(dir) {
        out::print_warn(&format!(
            "File logging disabled: {e:#}. Logs will continue to stdout."
        ));
        return layers;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(rolling_prefix(lvl))
        .filename_suffix("log")
        .build(dir)
    {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            layers.push(fmt_layer(writer, json, false));
        }
        Err(e) => out::print_warn(&format!(
            "Could not open rolling log in '{}': {e}",
            dir.display()
        )),
    }

    let errors_path = dir.join(ERROR_LOG_NAME);
    match open_log_file_secure_append(&errors_path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            guards.push(guard);
            layers.push(fmt_layer(writer, json, false).with_filter(LevelFilter::WARN).boxed());
        }
        Err(e) => out::print_warn(&format!(
            "Could not open error log {}: {e}",
            errors_path.display()
        )),
    }
    layers
}

/// Initialize the global subscriber. Returns the worker guards of the file writers.
pub fn init_tracing(lvl: LogLevel, log_dir: Option<&Path>, json: bool) -> Result<Vec<WorkerGuard>> {
    let env_filter = env_filter_from_level(to_level_filter(lvl));
    let mut guards = Vec::new();

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(
        std::io::stdout,
        json,
        atty::is(atty::Stream::Stdout),
    )];
    if let Some(dir) = log_dir {
        layers.extend(file_layers(dir, lvl, json, &mut guards));
    }

    registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(guards)
}
