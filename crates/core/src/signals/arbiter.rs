use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use signalgate_market_data::Symbol;

use super::model::{CooldownEntry, DenialReason, Direction, PermissionDecision};
use super::store::CooldownStore;
use crate::errors::Result;
use crate::utils::{elapsed_between, Clock};

/// Gates alerts per symbol: at most one approval per cooldown window.
///
/// The window blocks any new alert for the symbol, same direction or not.
/// Check and record happen while holding the symbol's map shard, so two
/// concurrent requests for one symbol resolve to one approval.
pub struct SignalCooldownArbiter {
    cooldown: Duration,
    entries: DashMap<Symbol, CooldownEntry>,
    clock: Arc<dyn Clock>,
    persist_lock: Mutex<()>,
}

impl SignalCooldownArbiter {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown,
            entries: DashMap::new(),
            clock,
            persist_lock: Mutex::new(()),
        }
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persist_lock.lock().unwrap_or_else(|poisoned| {
            warn!("SignalCooldownArbiter persist mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Approve and record, or deny without touching state.
    pub fn request_permission(&self, symbol: &Symbol, direction: Direction) -> PermissionDecision {
        let now = self.clock.now();

        match self.entries.entry(symbol.clone()) {
            Entry::Occupied(mut occupied) => {
                let last = occupied.get();
                let elapsed = elapsed_between(last.last_approved_at, now);
                if elapsed < self.cooldown {
                    let reason = DenialReason::WithinCooldown {
                        last_direction: last.last_direction,
                        elapsed,
                        remaining: self.cooldown - elapsed,
                        conflict: direction.conflicts_with(last.last_direction),
                    };
                    debug!("Denied {} {}: {}", direction, symbol, reason);
                    return PermissionDecision::Denied(reason);
                }
                occupied.insert(CooldownEntry {
                    symbol: symbol.clone(),
                    last_direction: direction,
                    last_approved_at: now,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CooldownEntry {
                    symbol: symbol.clone(),
                    last_direction: direction,
                    last_approved_at: now,
                });
            }
        }

        debug!("Approved {} {}", direction, symbol);
        PermissionDecision::Approved
    }

    pub fn entry(&self, symbol: &Symbol) -> Option<CooldownEntry> {
        self.entries.get(symbol).map(|e| e.value().clone())
    }

    /// Snapshot of every entry, ordered by symbol.
    pub fn entries(&self) -> Vec<CooldownEntry> {
        let mut entries: Vec<CooldownEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        entries
    }

    /// Drop entries whose cooldown has fully elapsed. Returns how many went.
    ///
    /// A missing entry and an expired one decide identically.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| elapsed_between(entry.last_approved_at, now) < self.cooldown);
        before.saturating_sub(self.entries.len())
    }

    /// Replace in-memory state with `entries`.
    pub fn restore(&self, entries: Vec<CooldownEntry>) {
        self.entries.clear();
        for entry in entries {
            self.entries.insert(entry.symbol.clone(), entry);
        }
    }

    /// Reload state from `store`. Returns the number of entries loaded.
    pub fn load_from(&self, store: &dyn CooldownStore) -> Result<usize> {
        let entries = store.load()?;
        let count = entries.len();
        self.restore(entries);
        debug!("Loaded {} cooldown entries", count);
        Ok(count)
    }

    /// Snapshot and save under one lock so an older snapshot never
    /// overwrites a newer one in the store.
    pub fn persist_to(&self, store: &dyn CooldownStore) -> Result<()> {
        let _guard = self.lock_persist();
        store.save(&self.entries())
    }
}
