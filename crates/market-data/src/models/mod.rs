//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Identifiers (Symbol, ProviderId)
//! - `snapshot` - Price snapshots returned by provider tiers
//! - `attempt` - Tier identity and the immutable record of every tier attempt

mod attempt;
mod snapshot;
mod types;

pub use attempt::{FetchAttempt, FetchOutcome, Tier};
pub use snapshot::PriceSnapshot;
pub use types::{ProviderId, Symbol};
