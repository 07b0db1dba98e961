//! Core library for `safe_sweep`.
//!
//! Sweeps a drop directory into dated folders: every file found directly inside the
//! root is locked exclusively, copied to `{root}/{yyyyMMdd}/{timestamp+index}{.ext}`,
//! verified by SHA-256 and only then deleted from the root.
//!
//! Layout:
//! - `config`: XML + CLI settings resolved into a [`Config`]
//! - `fs_ops`: locking, hashing and the copy/verify/delete pipeline
//! - `batch`: one sweep (listing, lock phase, sequential moves, tally) and the [`Sweeper`]
//! - `scheduler`: fixed-rate ticker that skips overlapping ticks
//! - `folder`: destination folder naming (Central European date)

pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod folder;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod scheduler;
pub mod shutdown;

pub use batch::{
    list_candidates, BatchClock, BatchJob, BatchSummary, ErrorTally, Sweeper, TickOutcome,
};
pub use config::{default_config_path, Config, LogLevel, RawSettings};
pub use errors::SweepError;
pub use fs_ops::{copy_verify_delete, ContentHasher, CopyOutcome, Sha256Hasher};
pub use scheduler::{Scheduler, SchedulerStats};
