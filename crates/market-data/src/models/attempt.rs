use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Symbol;
use crate::errors::MarketDataError;

/// One provider endpoint strategy in the fallback chain.
///
/// Declared in chain order: cheapest per symbol first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Many symbols in one call
    Bulk,
    /// Time series for a single symbol
    Individual,
    /// Lightweight price-only call
    Price,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Bulk, Tier::Individual, Tier::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "BULK",
            Self::Individual => "INDIVIDUAL",
            Self::Price => "PRICE",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result class of a single tier attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchOutcome {
    Success,
    Timeout,
    ProviderError,
    /// Denied by the rate budget or rejected with HTTP 429
    RateLimited,
}

impl FetchOutcome {
    pub fn from_error(error: &MarketDataError) -> Self {
        match error {
            MarketDataError::Timeout { .. } => Self::Timeout,
            MarketDataError::RateLimited { .. } | MarketDataError::BudgetExhausted { .. } => {
                Self::RateLimited
            }
            _ => Self::ProviderError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Timeout => "TIMEOUT",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::RateLimited => "RATE_LIMITED",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one tier attempt for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAttempt {
    pub symbol: Symbol,
    pub tier: Tier,
    pub timestamp: DateTime<Utc>,
    pub outcome: FetchOutcome,
    pub latency: Duration,
    /// Whether this attempt spent a provider call of its own.
    /// Reads from a shared bulk batch do not.
    pub call_issued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchAttempt {
    pub fn success(symbol: Symbol, tier: Tier, latency: Duration, call_issued: bool) -> Self {
        Self {
            symbol,
            tier,
            timestamp: Utc::now(),
            outcome: FetchOutcome::Success,
            latency,
            call_issued,
            error: None,
        }
    }

    pub fn failure(
        symbol: Symbol,
        tier: Tier,
        latency: Duration,
        call_issued: bool,
        error: &MarketDataError,
    ) -> Self {
        Self {
            symbol,
            tier,
            timestamp: Utc::now(),
            outcome: FetchOutcome::from_error(error),
            latency,
            call_issued,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order_matches_chain() {
        let mut tiers = vec![Tier::Price, Tier::Bulk, Tier::Individual];
        tiers.sort();
        assert_eq!(tiers, Tier::ALL.to_vec());
    }

    #[test]
    fn test_outcome_from_error() {
        let timeout = MarketDataError::Timeout {
            provider: "TWELVE_DATA".to_string(),
        };
        assert_eq!(FetchOutcome::from_error(&timeout), FetchOutcome::Timeout);

        let denied = MarketDataError::BudgetExhausted {
            retry_after: Duration::from_secs(5),
        };
        assert_eq!(FetchOutcome::from_error(&denied), FetchOutcome::RateLimited);

        let other = MarketDataError::ProviderError {
            provider: "TWELVE_DATA".to_string(),
            message: "500".to_string(),
        };
        assert_eq!(FetchOutcome::from_error(&other), FetchOutcome::ProviderError);
    }
}
