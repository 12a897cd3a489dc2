use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Injectable clock (Design Notes §9: "thread an injectable clock through the
/// core so tests can drive consensus ticks deterministically"). The core only
/// ever needs unix seconds; nothing here is calendar-aware.
pub trait Clock: Send + Sync {
    fn now_unix_secs(&self) -> u64;
}

/// Wall-clock backed implementation used by the interactive driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_secs()
    }
}

/// A clock tests (and the scripted `--simulate` driver) can advance by hand,
/// so a whole election can run without sleeping real wall-clock seconds.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, value: u64) {
        self.now.store(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_unix_secs(), 100);
        clock.advance(30);
        assert_eq!(clock.now_unix_secs(), 130);
    }
}
