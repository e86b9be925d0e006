//! Market data provider trait definitions.
//!
//! This module defines the `MarketDataProvider` trait that every provider
//! must implement: one method per fallback tier.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{PriceSnapshot, Symbol};

/// Trait for market data providers.
///
/// Each method maps to one tier of the fallback chain. Implementations do
/// not apply rate limiting or timeouts themselves; the tier fetcher wraps
/// every call with the shared governor and a per-tier deadline.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use signalgate_market_data::provider::MarketDataProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     // ... implement the three tier methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "TWELVE_DATA".
    /// Used for logging and error attribution.
    fn id(&self) -> &'static str;

    /// Fetch many symbols in one provider call.
    ///
    /// Symbols the provider could not serve are simply absent from the map;
    /// an `Err` means the batch call itself failed.
    async fn fetch_bulk(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, PriceSnapshot>, MarketDataError>;

    /// Fetch the latest time-series bar for a single symbol.
    async fn fetch_series(&self, symbol: &Symbol) -> Result<PriceSnapshot, MarketDataError>;

    /// Fetch only the current price for a single symbol.
    async fn fetch_price(&self, symbol: &Symbol) -> Result<PriceSnapshot, MarketDataError>;
}
