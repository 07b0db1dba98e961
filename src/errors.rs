//! Typed error definitions for safe_sweep.
//! One variant per way a single file can fail to move; used for logs, the batch tally and tests.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Could not lock {path} exclusively: {source}")]
    LockUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Destination already exists: {0}")]
    Collision(PathBuf),

    #[error("Digest of copy {dest} does not match original (expected {expected}, got {actual})")]
    DigestMismatch {
        dest: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Insufficient space in {dest}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    #[error("{op} '{path}': {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Operation interrupted by shutdown request")]
    Interrupted,
}

impl SweepError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            SweepError::LockUnavailable { .. } => 10,
            SweepError::Collision(_) => 20,
            SweepError::DigestMismatch { .. } => 30,
            SweepError::InsufficientSpace { .. } => 35,
            SweepError::Io { .. } => 40,
            SweepError::Interrupted => 50,
        }
    }

    /// Short snake_case label used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SweepError::LockUnavailable { .. } => "lock_unavailable",
            SweepError::Collision(_) => "collision",
            SweepError::DigestMismatch { .. } => "digest_mismatch",
            SweepError::InsufficientSpace { .. } => "insufficient_space",
            SweepError::Io { .. } => "io",
            SweepError::Interrupted => "interrupted",
        }
    }

    /// Build an `Io` variant; handy with `map_err`.
    pub fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> SweepError {
        let path = path.into();
        move |source| SweepError::Io { op, path, source }
    }
}
