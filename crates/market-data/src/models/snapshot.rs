use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Symbol;
use crate::errors::MarketDataError;

/// Price observation returned by any provider tier.
///
/// Bulk and series tiers may fill the OHLC fields; the price-only tier
/// sets `price` alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub symbol: Symbol,

    /// Latest traded / closing price (required)
    pub price: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Provider timestamp when available, otherwise the receive time
    pub observed_at: DateTime<Utc>,

    /// Provider that produced the snapshot
    pub source: String,
}

impl PriceSnapshot {
    /// Create a price-only snapshot
    pub fn new(symbol: Symbol, price: Decimal, observed_at: DateTime<Utc>, source: String) -> Self {
        Self {
            symbol,
            price,
            open: None,
            high: None,
            low: None,
            volume: None,
            observed_at,
            source,
        }
    }

    /// Reject prices a provider should never return.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.price <= Decimal::ZERO {
            return Err(MarketDataError::ValidationFailed {
                message: format!("non-positive price {} for {}", self.price, self.symbol),
            });
        }
        if let (Some(high), Some(low)) = (self.high, self.low) {
            if high < low {
                return Err(MarketDataError::ValidationFailed {
                    message: format!("high {} below low {} for {}", high, low, self.symbol),
                });
            }
        }
        Ok(())
    }
}
