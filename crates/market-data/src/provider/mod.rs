//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Concrete provider implementations (TwelveData)
//!
//! Providers are plain endpoint adapters. Rate limiting, per-tier timeouts
//! and fallback between tiers live in the registry module.

mod traits;

pub mod twelve_data;

// Re-exports
pub use traits::MarketDataProvider;
