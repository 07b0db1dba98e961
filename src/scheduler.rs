//! Fixed-rate ticker.
//!
//! Ticks run on the calling thread, so two ticks never overlap. When a tick takes longer
//! than the interval the missed slots are dropped (never queued) and the next tick is
//! aligned to the original schedule. Sleeping happens in short slices so a shutdown
//! request is noticed quickly.

use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::shutdown;

const MAX_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    /// Slots dropped because the previous tick was still running.
    pub skipped: u64,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    poll: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            interval,
            poll: interval.min(MAX_POLL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick every interval until a shutdown is requested.
    pub fn run<F: FnMut()>(&self, tick: F) -> SchedulerStats {
        self.run_until(tick, shutdown::is_requested)
    }

    /// Tick every interval (first tick one interval from now) until `should_stop` is true.
    pub fn run_until<F, S>(&self, mut tick: F, mut should_stop: S) -> SchedulerStats
    where
        F: FnMut(),
        S: FnMut() -> bool,
    {
        let mut stats = SchedulerStats::default();
        let mut next = Instant::now() + self.interval;

        loop {
            loop {
                if should_stop() {
                    debug!(ticks = stats.ticks, skipped = stats.skipped, "scheduler stopping");
                    return stats;
                }
                let now = Instant::now();
                if now >= next {
                    break;
                }
                thread::sleep((next - now).min(self.poll));
            }

            tick();
            stats.ticks += 1;
            next += self.interval;

            let now = Instant::now();
            if now >= next {
                let behind = (now - next).as_nanos() / self.interval.as_nanos();
                let missed = u64::try_from(behind).unwrap_or(u64::MAX).saturating_add(1);
                warn!(
                    missed,
                    interval_ms = self.interval.as_millis() as u64,
                    "Sweep took longer than the scan interval; skipping {missed} tick(s)"
                );
                stats.skipped = stats.skipped.saturating_add(missed);
                next += self.interval * u32::try_from(missed).unwrap_or(u32::MAX);
            }
        }
    }
}
