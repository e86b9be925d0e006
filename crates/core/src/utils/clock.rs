use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::warn;

/// Wall-clock time source.
///
/// Exclusion expiries and cooldown stamps are persisted and must survive a
/// restart, so they use wall time. The rate governor does not go through
/// this trait; it reads the monotonic tokio clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time only advances via explicit `advance()` / `set()` calls.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    fn lock_now(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| {
            warn!("ManualClock mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock_now();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock_now() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock_now()
    }
}

/// `at + by`, saturating at the latest representable instant.
pub fn offset(at: DateTime<Utc>, by: std::time::Duration) -> DateTime<Utc> {
    Duration::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time from `earlier` to `now`, zero if `earlier` is in the future.
pub fn elapsed_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (now - earlier).to_std().unwrap_or_default()
}
