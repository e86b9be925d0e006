//! One scan cycle over the symbol universe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use signalgate_market_data::{BulkBatch, Symbol, SymbolFetch, TierFallbackFetcher};
use tokio::task;

use super::errors::ScanError;
use super::report::{ScanReport, SymbolPrice};
use crate::exclusions::{ExclusionRegistry, ExclusionStore};
use crate::utils::Clock;

/// Marks a cycle as running for as long as it lives.
struct CycleGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Drives scan cycles: partition, bulk prefetch, bounded per-symbol
/// fallback, registry updates, report.
pub struct ScanOrchestrator {
    fetcher: Arc<TierFallbackFetcher>,
    registry: Arc<ExclusionRegistry>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
    bulk_batch_size: usize,
    store: Option<Arc<dyn ExclusionStore>>,
    running: AtomicBool,
    latest: Mutex<Option<Arc<ScanReport>>>,
}

impl ScanOrchestrator {
    pub fn new(
        fetcher: Arc<TierFallbackFetcher>,
        registry: Arc<ExclusionRegistry>,
        clock: Arc<dyn Clock>,
        concurrency: usize,
        bulk_batch_size: usize,
    ) -> Self {
        Self {
            fetcher,
            registry,
            clock,
            concurrency: concurrency.max(1),
            bulk_batch_size: bulk_batch_size.max(1),
            store: None,
            running: AtomicBool::new(false),
            latest: Mutex::new(None),
        }
    }

    /// Persist exclusion state after every cycle.
    pub fn with_store(mut self, store: Arc<dyn ExclusionStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn lock_latest(&self) -> MutexGuard<'_, Option<Arc<ScanReport>>> {
        self.latest.lock().unwrap_or_else(|poisoned| {
            warn!("ScanOrchestrator mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn registry(&self) -> &Arc<ExclusionRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Report of the last completed cycle.
    pub fn latest_report(&self) -> Option<Arc<ScanReport>> {
        self.lock_latest().clone()
    }

    /// Run one cycle. Rejected while another cycle is in flight.
    ///
    /// Individual symbol failures never abort the cycle; a report is
    /// returned even when every fetch fails.
    pub async fn run_scan_cycle(&self, universe: &[Symbol]) -> Result<Arc<ScanReport>, ScanError> {
        let Some(_guard) = CycleGuard::acquire(&self.running) else {
            debug!("Scan cycle rejected: previous cycle still running");
            return Err(ScanError::CycleAlreadyRunning);
        };

        let mut report = ScanReport::new(self.clock.now());
        let (eligible, excluded) = self.registry.partition(universe);
        report.excluded_count = excluded.len();

        info!(
            "Scan cycle {} starting: {} eligible, {} excluded",
            report.cycle_id,
            eligible.len(),
            excluded.len()
        );

        // One governed bulk call per chunk, before any per-symbol fallback.
        let chunks: Vec<Vec<Symbol>> = eligible
            .chunks(self.bulk_batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let fetcher = self.fetcher.clone();
        let batches: Vec<Arc<BulkBatch>> = stream::iter(chunks)
            .map(move |chunk| {
                let fetcher = fetcher.clone();
                async move { Arc::new(fetcher.fetch_bulk(&chunk).await) }
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        report.total_calls_used += batches.iter().filter(|b| b.call_issued()).count() as u64;

        let jobs: Vec<(usize, Symbol, Arc<BulkBatch>)> = eligible
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, symbol)| {
                let batch = batches[index / self.bulk_batch_size].clone();
                (index, symbol, batch)
            })
            .collect();
        let fetcher = self.fetcher.clone();
        let mut fetches: Vec<(usize, SymbolFetch)> = stream::iter(jobs)
            .map(move |(index, symbol, batch)| {
                let fetcher = fetcher.clone();
                async move { (index, fetcher.fetch_with_batch(&symbol, &batch).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        fetches.sort_by_key(|(index, _)| *index);

        for (_, fetch) in fetches {
            self.registry.record_outcome(&fetch.symbol, fetch.is_success());
            report.total_calls_used += fetch.calls_issued() as u64;

            match &fetch.result {
                Ok(success) => {
                    *report.tier_distribution.entry(success.tier).or_insert(0) += 1;
                    report.successful.push(SymbolPrice {
                        symbol: fetch.symbol.clone(),
                        price: success.snapshot.price,
                        tier: success.tier,
                        latency_ms: success.latency.as_millis() as u64,
                        observed_at: success.snapshot.observed_at,
                        source: success.snapshot.source.clone(),
                    });
                }
                Err(_) => {
                    debug!(
                        "{} failed this cycle: {}",
                        fetch.symbol,
                        fetch.diagnostics().summary()
                    );
                    report.failed.push(fetch.symbol.clone());
                }
            }
            report.attempts.extend(fetch.attempts);
        }

        if let Some(store) = self.store.clone() {
            let registry = self.registry.clone();
            match task::spawn_blocking(move || registry.persist_to(store.as_ref())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to persist exclusion state: {}", e),
                Err(e) => warn!("Exclusion persist task failed: {}", e),
            }
        }

        report.finished_at = self.clock.now();
        info!("Scan cycle {} finished: {}", report.cycle_id, report.summary());

        let report = Arc::new(report);
        *self.lock_latest() = Some(report.clone());
        Ok(report)
    }
}
