//! Cooperative stop flag.
//!
//! Set once by the SIGINT/SIGTERM handler; read by the scheduler between ticks, by the
//! batch before each file and by the copy loop between chunks. Never cleared.

use std::sync::atomic::{AtomicBool, Ordering};

static STOP: AtomicBool = AtomicBool::new(false);

/// Ask every running sweep to stop at its next checkpoint. Signal-safe and idempotent.
pub fn request() {
    STOP.store(true, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
    STOP.load(Ordering::SeqCst)
}
