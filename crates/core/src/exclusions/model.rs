use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signalgate_market_data::Symbol;

/// Threshold and backoff steps for exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    /// Consecutive failures before the first exclusion.
    pub threshold: u32,
    /// Non-decreasing exclusion lengths. The last step repeats.
    pub backoff_schedule: Vec<Duration>,
}

impl ExclusionPolicy {
    /// Backoff for the given step, capped at the last entry.
    pub fn backoff_for(&self, index: u32) -> Duration {
        let last = self.backoff_schedule.len().saturating_sub(1);
        self.backoff_schedule
            .get((index as usize).min(last))
            .copied()
            .unwrap_or_default()
    }

    /// Highest usable backoff index.
    pub fn max_index(&self) -> u32 {
        self.backoff_schedule.len().saturating_sub(1) as u32
    }
}

/// Failure history of one symbol.
///
/// Entries exist for every symbol with a non-zero streak. `excluded_at` and
/// `expires_at` stay `None` until the streak first reaches the threshold,
/// and keep their last values after the exclusion expires (probation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionEntry {
    pub symbol: Symbol,
    pub failure_streak: u32,
    pub excluded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Schedule step the next exclusion will use.
    pub backoff_index: u32,
}

impl ExclusionEntry {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            failure_streak: 0,
            excluded_at: None,
            expires_at: None,
            backoff_index: 0,
        }
    }

    pub fn is_excluded_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now < expires)
    }

    /// Exclusion has expired but the symbol has not succeeded since.
    pub fn is_on_probation_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionStats {
    /// Symbols with any failure history.
    pub tracked: usize,
    pub excluded: usize,
    pub on_probation: usize,
}
