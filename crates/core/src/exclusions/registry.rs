use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use signalgate_market_data::Symbol;

use super::model::{ExclusionEntry, ExclusionPolicy, ExclusionStats};
use super::store::ExclusionStore;
use crate::errors::Result;
use crate::utils::{offset, Clock};

/// Tracks failure streaks and exclusions per symbol.
///
/// All state transitions go through one mutex; readers never mutate.
pub struct ExclusionRegistry {
    policy: ExclusionPolicy,
    entries: Mutex<HashMap<Symbol, ExclusionEntry>>,
    clock: Arc<dyn Clock>,
    persist_lock: Mutex<()>,
}

impl ExclusionRegistry {
    pub fn new(policy: ExclusionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
            clock,
            persist_lock: Mutex::new(()),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Symbol, ExclusionEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("ExclusionRegistry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persist_lock.lock().unwrap_or_else(|poisoned| {
            warn!("ExclusionRegistry persist mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    /// True only while the symbol's exclusion has not expired.
    pub fn is_excluded(&self, symbol: &Symbol) -> bool {
        let now = self.clock.now();
        self.lock_entries()
            .get(symbol)
            .is_some_and(|entry| entry.is_excluded_at(now))
    }

    /// Split `symbols` into (eligible, excluded), preserving order.
    ///
    /// Repeated symbols keep only their first occurrence.
    pub fn partition(&self, symbols: &[Symbol]) -> (Vec<Symbol>, Vec<Symbol>) {
        let now = self.clock.now();
        let entries = self.lock_entries();
        let mut seen = HashSet::with_capacity(symbols.len());
        symbols
            .iter()
            .filter(|symbol| seen.insert(*symbol))
            .cloned()
            .partition(|symbol| {
                !entries
                    .get(symbol)
                    .is_some_and(|entry| entry.is_excluded_at(now))
            })
    }

    /// Apply one cycle's outcome for `symbol`.
    pub fn record_outcome(&self, symbol: &Symbol, success: bool) {
        let now = self.clock.now();
        let mut entries = self.lock_entries();

        if success {
            if let Some(previous) = entries.remove(symbol) {
                if previous.expires_at.is_some() {
                    info!(
                        "Symbol {} rehabilitated after {} consecutive failures",
                        symbol, previous.failure_streak
                    );
                }
            }
            return;
        }

        let entry = entries
            .entry(symbol.clone())
            .or_insert_with(|| ExclusionEntry::new(symbol.clone()));
        entry.failure_streak = entry.failure_streak.saturating_add(1);

        if entry.failure_streak < self.policy.threshold {
            debug!(
                "Symbol {} failure streak {}/{}",
                symbol, entry.failure_streak, self.policy.threshold
            );
            return;
        }

        let backoff = self.policy.backoff_for(entry.backoff_index);
        entry.excluded_at = Some(now);
        entry.expires_at = Some(offset(now, backoff));
        entry.backoff_index = (entry.backoff_index + 1).min(self.policy.max_index());

        info!(
            "Symbol {} excluded for {:?} after {} consecutive failures",
            symbol, backoff, entry.failure_streak
        );
    }

    pub fn entry(&self, symbol: &Symbol) -> Option<ExclusionEntry> {
        self.lock_entries().get(symbol).cloned()
    }

    /// Snapshot of every tracked entry, ordered by symbol.
    pub fn entries(&self) -> Vec<ExclusionEntry> {
        let mut entries: Vec<ExclusionEntry> = self.lock_entries().values().cloned().collect();
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        entries
    }

    /// Symbols currently excluded, ordered by symbol.
    pub fn excluded_symbols(&self) -> Vec<Symbol> {
        let now = self.clock.now();
        let mut symbols: Vec<Symbol> = self
            .lock_entries()
            .values()
            .filter(|entry| entry.is_excluded_at(now))
            .map(|entry| entry.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    pub fn stats(&self) -> ExclusionStats {
        let now = self.clock.now();
        let entries = self.lock_entries();
        ExclusionStats {
            tracked: entries.len(),
            excluded: entries.values().filter(|e| e.is_excluded_at(now)).count(),
            on_probation: entries.values().filter(|e| e.is_on_probation_at(now)).count(),
        }
    }

    /// Replace in-memory state with `entries`.
    pub fn restore(&self, entries: Vec<ExclusionEntry>) {
        let mut map = self.lock_entries();
        map.clear();
        for entry in entries {
            map.insert(entry.symbol.clone(), entry);
        }
    }

    /// Reload state from `store`. Returns the number of entries loaded.
    pub fn load_from(&self, store: &dyn ExclusionStore) -> Result<usize> {
        let entries = store.load()?;
        let count = entries.len();
        self.restore(entries);
        debug!("Loaded {} exclusion entries", count);
        Ok(count)
    }

    /// Snapshot and save under one lock so saves land in snapshot order.
    pub fn persist_to(&self, store: &dyn ExclusionStore) -> Result<()> {
        let _guard = self.lock_persist();
        store.save(&self.entries())
    }
}
