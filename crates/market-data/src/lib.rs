//! SignalGate Market Data Crate
//!
//! This crate acquires price snapshots from rate-limited providers for the
//! SignalGate scanner.
//!
//! # Overview
//!
//! The market data crate supports:
//! - One shared call budget per process, enforced over a rolling window
//! - A fixed fallback chain of provider tiers per symbol
//! - A TwelveData REST provider
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          |  Orchestrator    |  (signalgate-core)
//!                          +------------------+
//!                                  |
//!                                  v
//!                        +----------------------+
//!                        | TierFallbackFetcher  |  (bulk -> individual -> price)
//!                        +----------------------+
//!                           |               |
//!                           v               v
//!               +-------------------+  +------------------+
//!               | RateBudgetGovernor|  |    Provider      |  (TwelveData, mocks)
//!               +-------------------+  +------------------+
//!                                              |
//!                                              v
//!                                      +------------------+
//!                                      |  PriceSnapshot   |
//!                                      +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Symbol`] - Normalized ticker identifier
//! - [`PriceSnapshot`] - Price (and optional OHLCV) returned by any tier
//! - [`FetchAttempt`] - Immutable record of one tier attempt
//! - [`Tier`] - Bulk, individual series, or price-only
//! - [`RateBudgetGovernor`] - Shared call budget
//! - [`TierFallbackFetcher`] - Chain walker

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{FetchAttempt, FetchOutcome, PriceSnapshot, ProviderId, Symbol, Tier};

// Re-export provider types
pub use provider::twelve_data::TwelveDataProvider;
pub use provider::MarketDataProvider;

// Re-export registry types
pub use registry::{
    Acquisition, BulkBatch, FallbackChain, FetchDiagnostics, FetchSuccess, GovernorStatus,
    RateBudget, RateBudgetGovernor, RateWindow, SymbolFetch, TierFallbackFetcher, TierTrace,
};
