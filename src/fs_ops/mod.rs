//! Filesystem operations: modularized.
//! Locking, hashing and the copy/verify/delete pipeline used by each sweep.

mod hash;
mod helpers;
mod io_copy;
mod lock;
mod pipeline;
mod space;

pub use hash::{digests_match, ContentHasher, ReadSeek, Sha256Hasher};
pub use helpers::io_hint;
pub use io_copy::CopyStats;
pub use lock::{acquire, lock_all, lock_exclusive, LockAttempt, LockedFile};
pub use pipeline::{copy_verify_delete, destination_name, CopyOutcome};
