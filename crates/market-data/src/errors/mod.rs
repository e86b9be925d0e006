//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining fallback behavior

mod retry;

use std::time::Duration;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the tier fetcher should handle the error.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider does not know the symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The local rate budget denied the call before it was sent.
    #[error("Rate budget exhausted, retry after {retry_after:?}")]
    BudgetExhausted {
        /// Time until the governor will grant again
        retry_after: Duration,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider returned data that failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// Every tier in the chain was tried and all failed.
    #[error("All tiers failed for {symbol}")]
    AllTiersFailed {
        /// The symbol that could not be fetched
        symbol: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use signalgate_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "TWELVE_DATA".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::NextTier);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } => RetryClass::FailoverWithPenalty,

            Self::SymbolNotFound(_)
            | Self::BudgetExhausted { .. }
            | Self::Timeout { .. }
            | Self::ProviderError { .. }
            | Self::ValidationFailed { .. }
            | Self::AllTiersFailed { .. }
            | Self::Network(_) => RetryClass::NextTier,
        }
    }
}
