//! TwelveData market data provider implementation.
//!
//! Serves the three fallback tiers from TwelveData's REST API:
//! - Bulk via `/time_series` with a comma-separated symbol list
//! - Individual via `/time_series` for one symbol
//! - Price-only via `/price`
//!
//! Every request is a single call against the account's credit budget,
//! regardless of how many symbols a bulk request carries.
//! API documentation: https://twelvedata.com/docs

mod models;

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use self::models::{BulkSeriesResponse, ErrorBody, PriceResponse, SeriesResponse, SeriesValue};
use crate::errors::MarketDataError;
use crate::models::{PriceSnapshot, Symbol};
use crate::provider::MarketDataProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
const PROVIDER_ID: &str = "TWELVE_DATA";

/// Bar interval requested from `/time_series`.
const SERIES_INTERVAL: &str = "1min";

/// TwelveData market data provider.
pub struct TwelveDataProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TwelveDataProvider {
    /// Create a provider against the public API.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key)
    }

    /// Create a provider against a custom endpoint (proxies, test servers).
    ///
    /// The client timeout is only a backstop: the tier fetcher applies its
    /// own, shorter deadline to every call.
    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Make a GET request to the TwelveData API and return the raw body.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self
            .client
            .get(&url)
            .header("Authorization", format!("apikey {}", self.api_key));

        for (key, value) in params {
            request = request.query(&[(key, value)]);
        }

        debug!("TwelveData request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read response: {}", e),
            })?;

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        check_error_body(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_bulk(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, PriceSnapshot>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("symbol", joined.as_str()),
            ("interval", SERIES_INTERVAL),
            ("outputsize", "1"),
        ];
        let body = self.fetch("/time_series", &params).await?;
        parse_bulk_body(symbols, &body)
    }

    async fn fetch_series(&self, symbol: &Symbol) -> Result<PriceSnapshot, MarketDataError> {
        let params = [
            ("symbol", symbol.as_str()),
            ("interval", SERIES_INTERVAL),
            ("outputsize", "1"),
        ];
        let body = self.fetch("/time_series", &params).await?;
        parse_series_body(symbol, &body)
    }

    async fn fetch_price(&self, symbol: &Symbol) -> Result<PriceSnapshot, MarketDataError> {
        let params = [("symbol", symbol.as_str())];
        let body = self.fetch("/price", &params).await?;
        parse_price_body(symbol, &body)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn provider_error(message: String) -> MarketDataError {
    MarketDataError::ProviderError {
        provider: PROVIDER_ID.to_string(),
        message,
    }
}

/// Map an in-body error (HTTP 200 with `status: "error"`) to a typed error.
fn error_from_code(
    code: Option<u16>,
    message: Option<String>,
    symbol: Option<&Symbol>,
) -> MarketDataError {
    match code {
        Some(429) => MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        },
        Some(404) | Some(400) if symbol.is_some() => MarketDataError::SymbolNotFound(
            symbol.map(|s| s.to_string()).unwrap_or_default(),
        ),
        _ => provider_error(message.unwrap_or_else(|| "Unknown error".to_string())),
    }
}

fn check_error_body(body: &str) -> Result<(), MarketDataError> {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        if error.is_error() {
            return Err(error_from_code(error.code, error.message, None));
        }
    }
    Ok(())
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, MarketDataError> {
    Decimal::from_str(raw.trim()).map_err(|_| MarketDataError::ValidationFailed {
        message: format!("Invalid {} value: {}", field, raw),
    })
}

fn parse_optional(raw: Option<&String>) -> Option<Decimal> {
    raw.and_then(|v| Decimal::from_str(v.trim()).ok())
}

/// Parse a TwelveData bar timestamp ("2024-05-01 12:34:00" or "2024-05-01").
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn snapshot_from_series(
    symbol: &Symbol,
    response: SeriesResponse,
) -> Result<PriceSnapshot, MarketDataError> {
    if response.status.as_deref() == Some("error") {
        return Err(error_from_code(response.code, response.message, Some(symbol)));
    }

    let value: SeriesValue = response.values.into_iter().next().ok_or_else(|| {
        MarketDataError::SymbolNotFound(format!("No series values for {}", symbol))
    })?;

    let snapshot = PriceSnapshot {
        symbol: symbol.clone(),
        price: parse_decimal(&value.close, "close")?,
        open: parse_optional(value.open.as_ref()),
        high: parse_optional(value.high.as_ref()),
        low: parse_optional(value.low.as_ref()),
        volume: parse_optional(value.volume.as_ref()),
        observed_at: parse_datetime(&value.datetime).unwrap_or_else(Utc::now),
        source: PROVIDER_ID.to_string(),
    };
    snapshot.validate()?;
    Ok(snapshot)
}

pub(crate) fn parse_series_body(
    symbol: &Symbol,
    body: &str,
) -> Result<PriceSnapshot, MarketDataError> {
    let response: SeriesResponse = serde_json::from_str(body)
        .map_err(|e| provider_error(format!("Failed to parse time_series response: {}", e)))?;
    snapshot_from_series(symbol, response)
}

/// Parse a multi-symbol `/time_series` body.
///
/// A single requested symbol comes back in the single-series shape.
/// Entries that errored or failed validation are left out of the map.
pub(crate) fn parse_bulk_body(
    symbols: &[Symbol],
    body: &str,
) -> Result<HashMap<Symbol, PriceSnapshot>, MarketDataError> {
    if let [only] = symbols {
        return Ok(match parse_series_body(only, body) {
            Ok(snapshot) => HashMap::from([(only.clone(), snapshot)]),
            Err(e) => {
                debug!("Bulk entry for {} dropped: {}", only, e);
                HashMap::new()
            }
        });
    }

    let response: BulkSeriesResponse = serde_json::from_str(body)
        .map_err(|e| provider_error(format!("Failed to parse bulk time_series response: {}", e)))?;

    let mut snapshots = HashMap::with_capacity(response.len());
    for (key, entry) in response {
        let symbol = Symbol::new(&key);
        match snapshot_from_series(&symbol, entry) {
            Ok(snapshot) => {
                snapshots.insert(symbol, snapshot);
            }
            Err(e) => debug!("Bulk entry for {} dropped: {}", symbol, e),
        }
    }

    let missing = symbols.iter().filter(|s| !snapshots.contains_key(*s)).count();
    if missing > 0 {
        warn!(
            "TwelveData bulk response missing {} of {} symbols",
            missing,
            symbols.len()
        );
    }

    Ok(snapshots)
}

pub(crate) fn parse_price_body(
    symbol: &Symbol,
    body: &str,
) -> Result<PriceSnapshot, MarketDataError> {
    let response: PriceResponse = serde_json::from_str(body)
        .map_err(|e| provider_error(format!("Failed to parse price response: {}", e)))?;

    if response.status.as_deref() == Some("error") {
        return Err(error_from_code(response.code, response.message, Some(symbol)));
    }

    let raw = response
        .price
        .ok_or_else(|| MarketDataError::SymbolNotFound(format!("No price for {}", symbol)))?;

    let snapshot = PriceSnapshot::new(
        symbol.clone(),
        parse_decimal(&raw, "price")?,
        Utc::now(),
        PROVIDER_ID.to_string(),
    );
    snapshot.validate()?;
    Ok(snapshot)
}
