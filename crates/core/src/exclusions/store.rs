//! Exclusion storage trait.

use super::model::ExclusionEntry;
use crate::errors::Result;

/// Durable storage for the exclusion registry.
///
/// `save` replaces the whole stored collection with `entries`.
pub trait ExclusionStore: Send + Sync {
    fn load(&self) -> Result<Vec<ExclusionEntry>>;

    fn save(&self, entries: &[ExclusionEntry]) -> Result<()>;
}
