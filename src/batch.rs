//! One sweep of the root directory.
//!
//! Per tick: list regular files directly inside the root, lock them all in parallel,
//! then run copy/verify/delete for each locked file in listing order, one at a time.
//! Failures are isolated per file and only counted; nothing aborts the batch.

use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::SweepError;
use crate::folder::today_folder_name;
use crate::fs_ops::{
    copy_verify_delete, io_hint, lock_all, ContentHasher, CopyOutcome, LockAttempt, Sha256Hasher,
};
use crate::shutdown;

/// Per-batch failure counters, reset for every [`BatchJob`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorTally {
    pub lock_failed: usize,
    pub collisions: usize,
    pub digest_mismatches: usize,
    pub other: usize,
}

impl ErrorTally {
    pub fn record(&mut self, outcome: &CopyOutcome) {
        match outcome {
            CopyOutcome::Moved(_) => {}
            CopyOutcome::LockFailed => self.lock_failed += 1,
            CopyOutcome::Collision => self.collisions += 1,
            CopyOutcome::DigestMismatch => self.digest_mismatches += 1,
            CopyOutcome::Failed => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.lock_failed + self.collisions + self.digest_mismatches + self.other
    }
}

/// What one batch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub listed: usize,
    pub moved: usize,
    pub failed: usize,
    pub destination: PathBuf,
    pub tally: ErrorTally,
}

impl BatchSummary {
    fn empty(destination: PathBuf) -> Self {
        Self {
            listed: 0,
            moved: 0,
            failed: 0,
            destination,
            tally: ErrorTally::default(),
        }
    }
}

/// Regular files directly inside `root`, sorted by name. Directories and symlinks are skipped.
pub fn list_candidates(root: &Path) -> Result<Vec<PathBuf>, SweepError> {
    // Surface an unreadable root as one error instead of a stream of walk errors.
    fs::read_dir(root).map_err(SweepError::io("list root", root))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(e) => debug!(path = %e.path().display(), "skipping non-file entry"),
            Err(e) => warn!(error = %e, "Failed to read directory entry"),
        }
    }
    Ok(files)
}

/// One scan cycle: a snapshot of candidate files and where they go.
#[derive(Debug)]
pub struct BatchJob {
    destination: PathBuf,
    files: Vec<PathBuf>,
    timestamp: i64,
}

impl BatchJob {
    pub fn new(destination: impl Into<PathBuf>, files: Vec<PathBuf>, timestamp: i64) -> Self {
        Self {
            destination: destination.into(),
            files,
            timestamp,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Lock, then move each file sequentially. Never fails as a whole.
    pub fn run(self, hasher: &dyn ContentHasher) -> BatchSummary {
        let BatchJob {
            destination,
            files,
            timestamp,
        } = self;
        let listed = files.len();
        if listed == 0 {
            debug!(dest = %destination.display(), "No files found");
            return BatchSummary::empty(destination);
        }

        info!(
            count = listed,
            dest = %destination.display(),
            timestamp,
            "Found {listed} file(s) to move"
        );

        if let Err(e) = fs::create_dir_all(&destination) {
            error!(
                dest = %destination.display(),
                error = %e,
                hint = io_hint(&e).unwrap_or(""),
                "Failed to create destination folder; leaving all files in place"
            );
            return BatchSummary {
                listed,
                moved: 0,
                failed: listed,
                destination,
                tally: ErrorTally {
                    other: listed,
                    ..ErrorTally::default()
                },
            };
        }

        // Join barrier: every attempt has finished once this returns.
        let attempts = lock_all(&files);
        let locked = attempts.iter().filter(|a| a.is_locked()).count();
        debug!(locked, failed = listed - locked, "lock phase finished");

        let mut tally = ErrorTally::default();
        let mut moved = 0usize;
        let mut stopping = false;

        for attempt in attempts {
            let locked = match attempt {
                LockAttempt::Locked(locked) => locked,
                // Already logged by the lock phase.
                LockAttempt::Failed { .. } => {
                    tally.record(&CopyOutcome::LockFailed);
                    continue;
                }
            };

            if stopping || shutdown::is_requested() {
                if !stopping {
                    warn!("Shutdown requested; leaving remaining files for the next run");
                    stopping = true;
                }
                locked.release();
                tally.record(&CopyOutcome::Failed);
                continue;
            }

            let index = locked.index();
            let src = locked.path().to_path_buf();
            match copy_verify_delete(locked, &destination, timestamp, hasher) {
                Ok(dest) => {
                    moved += 1;
                    tally.record(&CopyOutcome::Moved(dest));
                }
                Err(e) => {
                    log_file_failure(index, &src, &e);
                    tally.record(&CopyOutcome::from(&e));
                }
            }
        }

        let failed = tally.total();
        if failed == 0 {
            info!(moved, dest = %destination.display(), "All {moved} file(s) moved successfully");
        } else {
            warn!(
                moved,
                failed,
                lock_failed = tally.lock_failed,
                collisions = tally.collisions,
                digest_mismatches = tally.digest_mismatches,
                other = tally.other,
                "Batch finished with {failed} error(s)"
            );
        }

        BatchSummary {
            listed,
            moved,
            failed,
            destination,
            tally,
        }
    }
}

fn log_file_failure(index: usize, path: &Path, e: &SweepError) {
    let hint = match e {
        SweepError::Io { source, .. } | SweepError::LockUnavailable { source, .. } => {
            io_hint(source)
        }
        _ => None,
    };
    error!(
        code = e.code(),
        kind = e.kind(),
        index,
        path = %path.display(),
        hint = hint.unwrap_or(""),
        "Failed to move file: {e}"
    );
}

/// Hands out batch timestamps that never go backwards and never reuse a name.
#[derive(Debug, Default)]
pub struct BatchClock {
    floor: AtomicI64,
}

impl BatchClock {
    /// Stamp for a batch of `count` files started at `now_ms`.
    pub fn stamp(&self, now_ms: i64, count: usize) -> i64 {
        let ts = now_ms.max(self.floor.load(Ordering::Relaxed));
        self.floor
            .store(ts.saturating_add(count as i64), Ordering::Relaxed);
        ts
    }
}

/// Result of one scheduler tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A previous tick of this sweeper was still running.
    Skipped,
    Completed(BatchSummary),
    /// The root could not be listed; nothing was touched.
    ListingFailed(SweepError),
}

/// Long-lived driver that builds and runs a [`BatchJob`] on every tick.
pub struct Sweeper {
    root: PathBuf,
    date_override: Option<NaiveDate>,
    hasher: Box<dyn ContentHasher>,
    clock: BatchClock,
    running: AtomicBool,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("root", &self.root)
            .field("date_override", &self.date_override)
            .field("hasher", &self.hasher.algorithm())
            .finish()
    }
}

struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Sweeper {
    pub fn new(config: &Config) -> Self {
        Self::with_hasher(config, Box::new(Sha256Hasher))
    }

    pub fn with_hasher(config: &Config, hasher: Box<dyn ContentHasher>) -> Self {
        Self {
            root: config.root.clone(),
            date_override: config.date_override,
            hasher,
            clock: BatchClock::default(),
            running: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one sweep now, unless one is already in progress.
    pub fn tick(&self) -> TickOutcome {
        let Some(_guard) = RunGuard::try_enter(&self.running) else {
            warn!(root = %self.root.display(), "Previous sweep still running; skipping tick");
            return TickOutcome::Skipped;
        };

        let files = match list_candidates(&self.root) {
            Ok(files) => files,
            Err(e) => {
                error!(
                    code = e.code(),
                    kind = e.kind(),
                    root = %self.root.display(),
                    "Failed to list root: {e}"
                );
                return TickOutcome::ListingFailed(e);
            }
        };

        // Recomputed every tick so a long-running service rolls over at midnight.
        let destination = self.root.join(today_folder_name(self.date_override));
        if files.is_empty() {
            debug!(root = %self.root.display(), "No files found");
            return TickOutcome::Completed(BatchSummary::empty(destination));
        }

        let timestamp = self.clock.stamp(Utc::now().timestamp_millis(), files.len());
        let job = BatchJob::new(destination, files, timestamp);
        TickOutcome::Completed(job.run(self.hasher.as_ref()))
    }
}
