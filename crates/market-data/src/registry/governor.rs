//! Shared rate budget for every provider call in the scanner.
//!
//! The governor admits at most `calls_per_window` calls in any rolling
//! `window`. The first call over budget starts a penalty block of fixed
//! length during which every acquisition is denied. It never sleeps:
//! callers get a `retry_after` and decide for themselves.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

/// Budget configuration for the governor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateBudget {
    /// Maximum calls granted within any rolling window.
    pub calls_per_window: u32,
    /// Length of the rolling window.
    pub window: Duration,
    /// Block imposed once the budget is exceeded. Independent of `window`.
    pub penalty: Duration,
}

/// Result of a single `try_acquire`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acquisition {
    pub granted: bool,
    /// Zero when granted.
    pub retry_after: Duration,
}

impl Acquisition {
    fn granted() -> Self {
        Self {
            granted: true,
            retry_after: Duration::ZERO,
        }
    }

    fn denied(retry_after: Duration) -> Self {
        Self {
            granted: false,
            retry_after,
        }
    }
}

/// Rolling window state.
///
/// Keeps the instants of granted calls still inside the window, so the
/// count is exact for any window position rather than per fixed bucket.
#[derive(Debug, Default)]
pub struct RateWindow {
    grants: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop grants that have aged out of the window.
    fn evict(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.grants.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// Check-and-increment at an explicit instant.
    pub fn try_acquire_at(&mut self, budget: &RateBudget, now: Instant) -> Acquisition {
        self.evict(budget.window, now);

        if let Some(until) = self.blocked_until {
            if now < until {
                return Acquisition::denied(until - now);
            }
            self.blocked_until = None;
        }

        if (self.grants.len() as u64) < budget.calls_per_window as u64 {
            self.grants.push_back(now);
            return Acquisition::granted();
        }

        self.blocked_until = Some(now + budget.penalty);
        Acquisition::denied(budget.penalty)
    }

    /// Force the penalty block, extending an existing one if it ends sooner.
    pub fn impose_penalty_at(&mut self, budget: &RateBudget, now: Instant) {
        let until = now + budget.penalty;
        match self.blocked_until {
            Some(current) if current >= until => {}
            _ => self.blocked_until = Some(until),
        }
    }

    /// Start of the active window (oldest grant still counted).
    pub fn window_start(&self) -> Option<Instant> {
        self.grants.front().copied()
    }

    /// Grants counted in the active window.
    pub fn call_count(&self) -> u32 {
        self.grants.len() as u32
    }

    pub fn blocked_until(&self) -> Option<Instant> {
        self.blocked_until
    }
}

/// Point-in-time view of the governor for status reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GovernorStatus {
    pub calls_in_window: u32,
    pub budget: u32,
    pub blocked_for: Option<Duration>,
    pub granted_total: u64,
}

/// Thread-safe rate budget governor.
///
/// One instance is shared by every fetch task. The check-and-increment runs
/// under a single mutex so concurrent callers can never overspend.
pub struct RateBudgetGovernor {
    budget: RateBudget,
    window: Mutex<RateWindow>,
    granted_total: AtomicU64,
}

impl RateBudgetGovernor {
    pub fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            window: Mutex::new(RateWindow::new()),
            granted_total: AtomicU64::new(0),
        }
    }

    /// Lock the window mutex, recovering from poison if necessary.
    ///
    /// The window holds plain counters; a panic mid-update cannot leave it
    /// in a state worse than slightly stale accounting.
    fn lock_window(&self) -> MutexGuard<'_, RateWindow> {
        self.window.lock().unwrap_or_else(|poisoned| {
            warn!("Rate governor mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    /// Try to spend one call from the budget without waiting.
    pub fn try_acquire(&self) -> Acquisition {
        let now = Instant::now();
        let mut window = self.lock_window();
        let was_blocked = window.blocked_until().is_some_and(|until| now < until);
        let acquisition = window.try_acquire_at(&self.budget, now);
        drop(window);

        if acquisition.granted {
            self.granted_total.fetch_add(1, Ordering::Relaxed);
        } else if was_blocked {
            debug!(
                "Rate governor: blocked, retry after {:?}",
                acquisition.retry_after
            );
        } else {
            info!(
                "Rate governor: budget of {} calls per {:?} exceeded, blocking for {:?}",
                self.budget.calls_per_window, self.budget.window, self.budget.penalty
            );
        }

        acquisition
    }

    /// Enter the penalty block immediately.
    ///
    /// Called when a provider answers 429 even though the local budget
    /// admitted the call.
    pub fn impose_penalty(&self) {
        let now = Instant::now();
        self.lock_window().impose_penalty_at(&self.budget, now);
        info!(
            "Rate governor: provider reported rate limit, blocking for {:?}",
            self.budget.penalty
        );
    }

    /// Total calls granted since construction.
    pub fn granted_total(&self) -> u64 {
        self.granted_total.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> GovernorStatus {
        let now = Instant::now();
        let mut window = self.lock_window();
        window.evict(self.budget.window, now);
        GovernorStatus {
            calls_in_window: window.call_count(),
            budget: self.budget.calls_per_window,
            blocked_for: window
                .blocked_until()
                .filter(|until| now < *until)
                .map(|until| until - now),
            granted_total: self.granted_total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn budget(calls: u32, window_secs: u64, penalty_secs: u64) -> RateBudget {
        RateBudget {
            calls_per_window: calls,
            window: Duration::from_secs(window_secs),
            penalty: Duration::from_secs(penalty_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_grants_exactly_budget() {
        let governor = RateBudgetGovernor::new(budget(45, 60, 120));

        let results: Vec<_> = (0..50).map(|_| governor.try_acquire()).collect();
        let granted = results.iter().filter(|a| a.granted).count();

        assert_eq!(granted, 45);
        assert_eq!(results.len() - granted, 5);
        assert!(results[..45].iter().all(|a| a.granted));

        let next = governor.try_acquire();
        assert!(!next.granted);
        assert_eq!(next.retry_after, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_down() {
        let governor = RateBudgetGovernor::new(budget(1, 60, 120));
        assert!(governor.try_acquire().granted);
        assert!(!governor.try_acquire().granted);

        tokio::time::advance(Duration::from_secs(30)).await;
        let denied = governor.try_acquire();
        assert!(!denied.granted);
        assert_eq!(denied.retry_after, Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_holds_even_after_window_expires() {
        let governor = RateBudgetGovernor::new(budget(2, 10, 60));
        governor.try_acquire();
        governor.try_acquire();
        assert!(!governor.try_acquire().granted);

        // Window is long gone but the penalty is not
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!governor.try_acquire().granted);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(governor.try_acquire().granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rolls() {
        let governor = RateBudgetGovernor::new(budget(3, 60, 1));
        assert!(governor.try_acquire().granted);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(governor.try_acquire().granted);
        assert!(governor.try_acquire().granted);

        // First grant ages out at t=60; the other two are still counted
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(governor.try_acquire().granted);
        assert_eq!(governor.status().calls_in_window, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_impose_penalty_blocks_immediately() {
        let governor = RateBudgetGovernor::new(budget(10, 60, 45));
        assert!(governor.try_acquire().granted);

        governor.impose_penalty();
        let denied = governor.try_acquire();
        assert!(!denied.granted);
        assert_eq!(denied.retry_after, Duration::from_secs(45));
        assert_eq!(governor.status().blocked_for, Some(Duration::from_secs(45)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_granted_total_tracks_grants_only() {
        let governor = RateBudgetGovernor::new(budget(2, 60, 60));
        for _ in 0..5 {
            governor.try_acquire();
        }
        assert_eq!(governor.granted_total(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_never_overspend() {
        let governor = Arc::new(RateBudgetGovernor::new(budget(45, 3600, 3600)));

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let governor = Arc::clone(&governor);
                tokio::spawn(async move { governor.try_acquire().granted })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 45);
    }
}
