//! Call governance and tier fallback.
//!
//! This module provides:
//! - A shared rolling-window rate budget with a penalty block
//! - The tiered fallback fetcher (bulk, individual, price)
//! - Per-symbol chain diagnostics

mod diagnostics;
mod fetcher;
mod governor;

pub use diagnostics::{FetchDiagnostics, TierTrace};
pub use fetcher::{BulkBatch, FallbackChain, FetchSuccess, SymbolFetch, TierFallbackFetcher};
pub use governor::{Acquisition, GovernorStatus, RateBudget, RateBudgetGovernor, RateWindow};
