//! Tiered fallback fetching for a single symbol.
//!
//! Each symbol walks an ordered [`FallbackChain`]: bulk batch, then the
//! individual series call, then the price-only call. Every tier that spends
//! a provider call asks the [`RateBudgetGovernor`] first and runs under its
//! own timeout. The walk stops at the first success and never runs two
//! tiers of one chain at the same time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::diagnostics::FetchDiagnostics;
use super::governor::RateBudgetGovernor;
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{FetchAttempt, PriceSnapshot, Symbol, Tier};
use crate::provider::MarketDataProvider;

/// Ordered list of tiers to try. Always sorted cheapest-first, no repeats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackChain {
    tiers: Vec<Tier>,
}

impl FallbackChain {
    pub fn new(tiers: impl IntoIterator<Item = Tier>) -> Self {
        let mut tiers: Vec<Tier> = tiers.into_iter().collect();
        tiers.sort();
        tiers.dedup();
        Self { tiers }
    }

    /// Bulk, individual, price.
    pub fn full() -> Self {
        Self::new(Tier::ALL)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::full()
    }
}

/// Result of one governed bulk call, shared by every symbol in the chunk.
#[derive(Debug, Default)]
pub struct BulkBatch {
    snapshots: HashMap<Symbol, PriceSnapshot>,
    error: Option<MarketDataError>,
    latency: Duration,
    call_issued: bool,
    attempted: bool,
}

impl BulkBatch {
    /// A batch that was never requested (empty chunk or no bulk tier).
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&PriceSnapshot> {
        self.snapshots.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Whether the batch call itself failed (as opposed to missing entries).
    pub fn error(&self) -> Option<&MarketDataError> {
        self.error.as_ref()
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Whether the governor granted the batch call.
    pub fn call_issued(&self) -> bool {
        self.call_issued
    }

    pub fn was_attempted(&self) -> bool {
        self.attempted
    }
}

/// A tier that produced a usable snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchSuccess {
    pub snapshot: PriceSnapshot,
    pub tier: Tier,
    pub latency: Duration,
}

/// Outcome of one symbol's chain walk.
#[derive(Debug)]
pub struct SymbolFetch {
    pub symbol: Symbol,
    /// `Err(AllTiersFailed)` when every tier failed or was denied.
    pub result: Result<FetchSuccess, MarketDataError>,
    pub attempts: Vec<FetchAttempt>,
}

impl SymbolFetch {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Provider calls spent by this chain, excluding shared batch reads.
    pub fn calls_issued(&self) -> usize {
        self.attempts.iter().filter(|a| a.call_issued).count()
    }

    pub fn diagnostics(&self) -> FetchDiagnostics {
        FetchDiagnostics::from_attempts(&self.attempts)
    }
}

/// Outcome of one governed provider call.
struct Guarded<T> {
    result: Result<T, MarketDataError>,
    latency: Duration,
    call_issued: bool,
}

/// Walks the fallback chain for symbols against one provider.
pub struct TierFallbackFetcher {
    provider: Arc<dyn MarketDataProvider>,
    governor: Arc<RateBudgetGovernor>,
    chain: FallbackChain,
    tier_timeout: Duration,
}

impl TierFallbackFetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        governor: Arc<RateBudgetGovernor>,
        tier_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            governor,
            chain: FallbackChain::full(),
            tier_timeout,
        }
    }

    pub fn with_chain(mut self, chain: FallbackChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn governor(&self) -> &Arc<RateBudgetGovernor> {
        &self.governor
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// Issue one governed bulk call for `symbols`.
    ///
    /// Entries that fail validation are dropped so those symbols fall
    /// through to the next tier.
    pub async fn fetch_bulk(&self, symbols: &[Symbol]) -> BulkBatch {
        if symbols.is_empty() || !self.chain.contains(Tier::Bulk) {
            return BulkBatch::skipped();
        }

        let guarded = self.guarded(|| self.provider.fetch_bulk(symbols)).await;

        match guarded.result {
            Ok(mut snapshots) => {
                snapshots.retain(|symbol, snapshot| match snapshot.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("Dropping bulk entry for {}: {}", symbol, e);
                        false
                    }
                });
                BulkBatch {
                    snapshots,
                    error: None,
                    latency: guarded.latency,
                    call_issued: guarded.call_issued,
                    attempted: true,
                }
            }
            Err(e) => {
                debug!("Bulk call for {} symbols failed: {}", symbols.len(), e);
                BulkBatch {
                    snapshots: HashMap::new(),
                    error: Some(e),
                    latency: guarded.latency,
                    call_issued: guarded.call_issued,
                    attempted: true,
                }
            }
        }
    }

    /// Fetch one symbol with a private bulk call.
    pub async fn fetch(&self, symbol: &Symbol) -> SymbolFetch {
        let batch = self.fetch_bulk(std::slice::from_ref(symbol)).await;
        let mut fetch = self.fetch_with_batch(symbol, &batch).await;
        if let Some(bulk) = fetch.attempts.iter_mut().find(|a| a.tier == Tier::Bulk) {
            bulk.call_issued = batch.call_issued();
        }
        fetch
    }

    /// Fetch one symbol, reading tier 1 from a batch shared with other symbols.
    ///
    /// The bulk attempt is recorded with `call_issued = false`; the caller
    /// that issued the batch accounts for it once.
    pub async fn fetch_with_batch(&self, symbol: &Symbol, batch: &BulkBatch) -> SymbolFetch {
        let mut attempts = Vec::with_capacity(self.chain.tiers().len());

        for &tier in self.chain.tiers() {
            let outcome = match tier {
                Tier::Bulk => {
                    if !batch.was_attempted() {
                        continue;
                    }
                    let result = match batch.get(symbol) {
                        Some(snapshot) => Ok(snapshot.clone()),
                        None => Err(match batch.error() {
                            Some(e) => clone_error(e),
                            None => MarketDataError::SymbolNotFound(format!(
                                "{} missing from bulk response",
                                symbol
                            )),
                        }),
                    };
                    Guarded {
                        result,
                        latency: batch.latency(),
                        call_issued: false,
                    }
                }
                Tier::Individual => {
                    self.guarded(|| self.provider.fetch_series(symbol))
                        .await
                }
                Tier::Price => self.guarded(|| self.provider.fetch_price(symbol)).await,
            };

            match outcome.result.and_then(|s| s.validate().map(|()| s)) {
                Ok(snapshot) => {
                    attempts.push(FetchAttempt::success(
                        symbol.clone(),
                        tier,
                        outcome.latency,
                        outcome.call_issued,
                    ));
                    return SymbolFetch {
                        symbol: symbol.clone(),
                        result: Ok(FetchSuccess {
                            snapshot,
                            tier,
                            latency: outcome.latency,
                        }),
                        attempts,
                    };
                }
                Err(e) => {
                    debug!("Tier {} failed for {}: {}", tier, symbol, e);
                    attempts.push(FetchAttempt::failure(
                        symbol.clone(),
                        tier,
                        outcome.latency,
                        outcome.call_issued,
                        &e,
                    ));
                }
            }
        }

        let fetch = SymbolFetch {
            symbol: symbol.clone(),
            result: Err(MarketDataError::AllTiersFailed {
                symbol: symbol.to_string(),
            }),
            attempts,
        };
        debug!(
            "All tiers failed for {}: {}",
            symbol,
            fetch.diagnostics().summary()
        );
        fetch
    }

    /// Ask the governor, then run `call` under the tier timeout.
    ///
    /// A provider-reported rate limit pushes the governor into its penalty
    /// block so the remaining chains stop spending calls.
    async fn guarded<T, F, Fut>(&self, call: F) -> Guarded<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let acquisition = self.governor.try_acquire();
        if !acquisition.granted {
            return Guarded {
                result: Err(MarketDataError::BudgetExhausted {
                    retry_after: acquisition.retry_after,
                }),
                latency: Duration::ZERO,
                call_issued: false,
            };
        }

        let started = Instant::now();
        let result = match tokio::time::timeout(self.tier_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                provider: self.provider.id().to_string(),
            }),
        };

        if let Err(e) = &result {
            if e.retry_class() == RetryClass::FailoverWithPenalty {
                self.governor.impose_penalty();
            }
        }

        Guarded {
            result,
            latency: started.elapsed(),
            call_issued: true,
        }
    }
}

/// `reqwest::Error` is not `Clone`; a failed batch is replayed to every
/// symbol in it, so rebuild an equivalent error.
fn clone_error(error: &MarketDataError) -> MarketDataError {
    match error {
        MarketDataError::SymbolNotFound(s) => MarketDataError::SymbolNotFound(s.clone()),
        MarketDataError::RateLimited { provider } => MarketDataError::RateLimited {
            provider: provider.clone(),
        },
        MarketDataError::BudgetExhausted { retry_after } => MarketDataError::BudgetExhausted {
            retry_after: *retry_after,
        },
        MarketDataError::Timeout { provider } => MarketDataError::Timeout {
            provider: provider.clone(),
        },
        MarketDataError::ProviderError { provider, message } => MarketDataError::ProviderError {
            provider: provider.clone(),
            message: message.clone(),
        },
        MarketDataError::ValidationFailed { message } => MarketDataError::ValidationFailed {
            message: message.clone(),
        },
        MarketDataError::AllTiersFailed { symbol } => MarketDataError::AllTiersFailed {
            symbol: symbol.clone(),
        },
        MarketDataError::Network(e) => MarketDataError::ProviderError {
            provider: "NETWORK".to_string(),
            message: e.to_string(),
        },
    }
}
