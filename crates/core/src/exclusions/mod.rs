//! Exclusion tracking for persistently failing symbols.
//!
//! A symbol that fails every tier on `threshold` consecutive cycles is
//! removed from scan eligibility for a backoff period. Each repeat
//! exclusion uses the next (longer) backoff step; one success clears the
//! symbol's history entirely.

mod model;
mod registry;
mod store;

pub use model::{ExclusionEntry, ExclusionPolicy, ExclusionStats};
pub use registry::ExclusionRegistry;
pub use store::ExclusionStore;
