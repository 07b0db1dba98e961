//! User-facing console lines (not logs).
//! Used by the binary for `--print-config`, `--once` summaries and startup failures.
//! Colors are enabled only when the stream is a TTY.

use owo_colors::OwoColorize;

use crate::batch::BatchSummary;

#[derive(Clone, Copy)]
enum Tone {
    Info,
    Warn,
    Error,
    Ok,
}

fn emit(tone: Tone, msg: &str) {
    let stderr = matches!(tone, Tone::Warn | Tone::Error);
    let tty = if stderr {
        atty::is(atty::Stream::Stderr)
    } else {
        atty::is(atty::Stream::Stdout)
    };
    let label = match tone {
        Tone::Info => "info:",
        Tone::Warn => "warn:",
        Tone::Error => "error:",
        Tone::Ok => "ok:",
    };
    let prefix = if !tty {
        label.to_string()
    } else {
        match tone {
            Tone::Info => label.cyan().bold().to_string(),
            Tone::Warn => label.yellow().bold().to_string(),
            Tone::Error => label.red().bold().to_string(),
            Tone::Ok => label.green().bold().to_string(),
        }
    };
    if stderr {
        eprintln!("{prefix} {msg}");
    } else {
        println!("{prefix} {msg}");
    }
}

pub fn print_info(msg: &str) {
    emit(Tone::Info, msg);
}

pub fn print_warn(msg: &str) {
    emit(Tone::Warn, msg);
}

pub fn print_error(msg: &str) {
    emit(Tone::Error, msg);
}

pub fn print_success(msg: &str) {
    emit(Tone::Ok, msg);
}

/// One-line result of a single sweep, for `--once` runs that scripts may inspect.
pub fn print_batch_summary(summary: &BatchSummary) {
    if summary.listed == 0 {
        print_info("no files found");
    } else if summary.failed == 0 {
        print_success(&format!(
            "moved {} of {} file(s) into {}",
            summary.moved,
            summary.listed,
            summary.destination.display()
        ));
    } else {
        print_warn(&format!(
            "moved {} of {} file(s) into {}; {} failed",
            summary.moved,
            summary.listed,
            summary.destination.display(),
            summary.failed
        ));
    }
}
