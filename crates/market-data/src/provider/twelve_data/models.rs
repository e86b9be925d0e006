//! TwelveData API response structures.

use std::collections::HashMap;

use serde::Deserialize;

/// Body shared by every endpoint when the request fails.
///
/// TwelveData frequently answers HTTP 200 with `status: "error"` and puts the
/// real status code in `code`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ErrorBody {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

#[derive(Debug, Deserialize)]
pub struct SeriesMeta {
    pub symbol: Option<String>,
}

/// One bar of a time series. All numbers arrive as strings.
#[derive(Debug, Deserialize)]
pub struct SeriesValue {
    pub datetime: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: String,
    pub volume: Option<String>,
}

/// Response from `/time_series` for a single symbol.
#[derive(Debug, Deserialize)]
pub struct SeriesResponse {
    pub meta: Option<SeriesMeta>,
    #[serde(default)]
    pub values: Vec<SeriesValue>,
    pub status: Option<String>,
    pub code: Option<u16>,
    pub message: Option<String>,
}

/// Response from `/time_series` with a comma-separated symbol list:
/// one `SeriesResponse` per requested symbol, keyed by symbol.
pub type BulkSeriesResponse = HashMap<String, SeriesResponse>;

/// Response from `/price`.
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    pub price: Option<String>,
    pub status: Option<String>,
    pub code: Option<u16>,
    pub message: Option<String>,
}
