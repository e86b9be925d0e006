use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use signalgate_market_data::{FetchAttempt, Symbol, Tier};
use uuid::Uuid;

/// A symbol priced during the cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPrice {
    pub symbol: Symbol,
    pub price: Decimal,
    pub tier: Tier,
    pub latency_ms: u64,
    pub observed_at: DateTime<Utc>,
    pub source: String,
}

/// Result of one scan cycle. Read-only once returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In universe order.
    pub successful: Vec<SymbolPrice>,
    /// Symbols for which every tier failed, in universe order.
    pub failed: Vec<Symbol>,
    pub excluded_count: usize,
    /// Provider calls the governor granted during the cycle.
    pub total_calls_used: u64,
    /// Winning tier per successful symbol.
    pub tier_distribution: BTreeMap<Tier, usize>,
    pub attempts: Vec<FetchAttempt>,
}

impl ScanReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at,
            successful: Vec::new(),
            failed: Vec::new(),
            excluded_count: 0,
            total_calls_used: 0,
            tier_distribution: BTreeMap::new(),
            attempts: Vec::new(),
        }
    }

    pub fn scanned(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn price_of(&self, symbol: &Symbol) -> Option<Decimal> {
        self.successful
            .iter()
            .find(|p| &p.symbol == symbol)
            .map(|p| p.price)
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        let tiers = self
            .tier_distribution
            .iter()
            .map(|(tier, count)| format!("{}: {}", tier, count))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} ok, {} failed, {} excluded, {} calls [{}]",
            self.successful.len(),
            self.failed.len(),
            self.excluded_count,
            self.total_calls_used,
            tiers
        )
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_summary_and_lookup() {
        let mut report = ScanReport::new(Utc::now());
        report.successful.push(SymbolPrice {
            symbol: Symbol::new("BTC/USD"),
            price: dec!(103881.5),
            tier: Tier::Bulk,
            latency_ms: 120,
            observed_at: Utc::now(),
            source: "TWELVE_DATA".to_string(),
        });
        report.failed.push(Symbol::new("XYZ"));
        report.excluded_count = 2;
        report.total_calls_used = 4;
        report.tier_distribution.insert(Tier::Bulk, 1);

        assert_eq!(report.scanned(), 2);
        assert_eq!(report.price_of(&Symbol::new("btc/usd")), Some(dec!(103881.5)));
        assert_eq!(report.summary(), "1 ok, 1 failed, 2 excluded, 4 calls [BULK: 1]");
    }

    #[test]
    fn test_tier_distribution_serializes_as_map() {
        let mut report = ScanReport::new(Utc::now());
        report.tier_distribution.insert(Tier::Price, 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tierDistribution"]["PRICE"], 3);
    }
}
