//! Cooldown storage trait.

use super::model::CooldownEntry;
use crate::errors::Result;

/// Durable storage for the cooldown arbiter.
///
/// `save` replaces the whole stored collection with `entries`.
pub trait CooldownStore: Send + Sync {
    fn load(&self) -> Result<Vec<CooldownEntry>>;

    fn save(&self, entries: &[CooldownEntry]) -> Result<()>;
}
