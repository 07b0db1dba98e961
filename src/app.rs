//! Application orchestrator.
//! Loads and merges config, initializes logging, installs the signal handler, then runs
//! one sweep (`--once`) or the fixed-rate service loop until interrupted.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use safe_sweep::cli::Args;
use safe_sweep::config::{
    load_or_init, load_raw_from_path, preview, resolve, LoadResult, Resolved, CONFIG_ENV,
};
use safe_sweep::output as out;
use safe_sweep::{
    default_config_path, shutdown, Config, RawSettings, Scheduler, Sweeper, TickOutcome,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config(&args);
        return Ok(());
    }

    let file_raw = match load_or_init(args.config.as_deref()).inspect_err(|e| {
        out::print_error(&format!("Failed to load config: {e:#}"));
    })? {
        LoadResult::Loaded(_, raw) => raw,
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template safe_sweep config was written to: {}",
                path.display()
            ));
            out::print_info("Running with defaults. Edit the file and restart to change them.");
            RawSettings::default()
        }
        LoadResult::Missing => RawSettings::default(),
    };

    // CLI wins over the file.
    let raw = file_raw.merge(args.overrides());
    let Resolved { config, notes } = resolve(&raw).inspect_err(|e| {
        out::print_error(&format!("Invalid configuration: {e:#}"));
    })?;

    let log_dir = config.effective_log_dir();
    let guards = init_tracing(config.log_level, Some(&log_dir), args.json).inspect_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e:#}"));
    })?;

    for note in &notes {
        warn!("{note}");
    }

    ctrlc::set_handler(|| {
        shutdown::request();
        out::print_warn("Received interrupt; finishing the current file and shutting down...");
    })
    .context("install signal handler")?;

    debug!(?config, "resolved configuration");
    let result = serve(&config, args.once);

    // Ensure logs are flushed before exit
    drop(guards);
    result
}

fn serve(config: &Config, once: bool) -> Result<()> {
    let sweeper = Sweeper::new(config);

    if once {
        info!(root = %config.root.display(), "Running a single sweep");
        return match sweeper.tick() {
            TickOutcome::Completed(summary) => {
                out::print_batch_summary(&summary);
                Ok(())
            }
            TickOutcome::Skipped => Ok(()),
            TickOutcome::ListingFailed(e) => {
                Err(anyhow!(e).context("sweep root could not be listed"))
            }
        };
    }

    let scheduler = Scheduler::new(config.scan_interval);
    info!(
        root = %config.root.display(),
        interval_ms = scheduler.interval().as_millis() as u64,
        date_override = ?config.date_override,
        debug = config.debug(),
        "Service started"
    );
    let stats = scheduler.run(|| {
        let _ = sweeper.tick();
    });
    info!(ticks = stats.ticks, skipped = stats.skipped, "Service stopped");
    Ok(())
}

/// Print where the config comes from and what it resolves to. Writes nothing.
fn print_config(args: &Args) {
    let path: Option<PathBuf> = args.config.clone().or_else(default_config_path);
    let Some(path) = path else {
        out::print_error("Could not determine a default config path");
        return;
    };

    if args.config.is_some() {
        out::print_info(&format!("Using --config:\n  {}\n", path.display()));
    } else if std::env::var_os(CONFIG_ENV).is_some_and(|v| !v.is_empty()) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {}\n", path.display()));
    } else {
        out::print_info(&format!("Default safe_sweep config path:\n  {}\n", path.display()));
    }

    let file_raw = if path.exists() {
        match load_raw_from_path(&path) {
            Ok(raw) => raw,
            Err(e) => {
                out::print_error(&format!("{e:#}"));
                return;
            }
        }
    } else {
        out::print_info(
            "No config file exists there yet. Run without --print-config to create a template.",
        );
        RawSettings::default()
    };

    match preview(&file_raw.merge(args.overrides())) {
        Ok(Resolved { config, notes }) => {
            for note in &notes {
                out::print_warn(note);
            }
            out::print_info(&format!(
                "Effective settings:\n  root:          {}\n  date override: {}\n  scan interval: {} ms\n  log level:     {}\n  log dir:       {}",
                config.root.display(),
                config
                    .date_override
                    .map(|d| d.format("%Y%m%d").to_string())
                    .unwrap_or_else(|| "none (today, Central European time)".into()),
                config.scan_interval.as_millis(),
                config.log_level,
                config.effective_log_dir().display(),
            ));
        }
        Err(e) => out::print_warn(&format!("Settings could not be resolved: {e:#}")),
    }
}
