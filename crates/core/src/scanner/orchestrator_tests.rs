//! Tests for ScanOrchestrator and ScanScheduler contracts.
//!
//! # Critical Contract Points
//!
//! 1. A cycle always returns a report, even when every fetch fails
//! 2. Overlapping cycles are rejected with `CycleAlreadyRunning`
//! 3. Excluded symbols are never fetched
//! 4. In-flight fetches never exceed the concurrency cap
//! 5. `total_calls_used` counts each bulk batch once
//! 6. A symbol repeated in the universe is scanned once

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use signalgate_market_data::{
        errors::MarketDataError, MarketDataProvider, PriceSnapshot, RateBudget,
        RateBudgetGovernor, Symbol, Tier, TierFallbackFetcher,
    };
    use tokio::sync::{watch, Notify};

    use crate::errors::Result;
    use crate::exclusions::{ExclusionEntry, ExclusionPolicy, ExclusionRegistry, ExclusionStore};
    use crate::scanner::{ScanError, ScanOrchestrator, ScanReport, ScanScheduler, SymbolUniverse};
    use crate::signals::{
        CandidateSignal, Direction, LogAlertSink, SignalAnalyzer, SignalCooldownArbiter,
        SignalPipeline,
    };
    use crate::utils::{Clock, ManualClock};

    // =========================================================================
    // Mock provider
    // =========================================================================

    /// Which tier answers for a symbol. Anything earlier fails.
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Plan {
        Bulk,
        Series,
        Price,
        Fail,
    }

    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct MockProvider {
        plans: Mutex<HashMap<Symbol, Plan>>,
        bulk_calls: AtomicUsize,
        series_calls: AtomicUsize,
        price_calls: AtomicUsize,
        requested: Mutex<Vec<Symbol>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        series_delay: Duration,
        gate: Option<Arc<Gate>>,
    }

    impl MockProvider {
        fn with_plans(plans: &[(&str, Plan)]) -> Self {
            Self {
                plans: Mutex::new(
                    plans
                        .iter()
                        .map(|(s, p)| (Symbol::new(*s), *p))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        fn plan(&self, symbol: &Symbol) -> Plan {
            self.plans
                .lock()
                .unwrap()
                .get(symbol)
                .copied()
                .unwrap_or(Plan::Fail)
        }

        fn set_plan(&self, symbol: &str, plan: Plan) {
            self.plans.lock().unwrap().insert(Symbol::new(symbol), plan);
        }

        fn snapshot(symbol: &Symbol) -> PriceSnapshot {
            PriceSnapshot::new(symbol.clone(), dec!(42.5), Utc::now(), "MOCK".to_string())
        }

        fn error() -> MarketDataError {
            MarketDataError::ProviderError {
                provider: "MOCK".to_string(),
                message: "HTTP 502".to_string(),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch_bulk(
            &self,
            symbols: &[Symbol],
        ) -> std::result::Result<HashMap<Symbol, PriceSnapshot>, MarketDataError> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().extend(symbols.iter().cloned());
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            Ok(symbols
                .iter()
                .filter(|s| self.plan(s) == Plan::Bulk)
                .map(|s| (s.clone(), Self::snapshot(s)))
                .collect())
        }

        async fn fetch_series(
            &self,
            symbol: &Symbol,
        ) -> std::result::Result<PriceSnapshot, MarketDataError> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.series_delay.is_zero() {
                tokio::time::sleep(self.series_delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.plan(symbol) {
                Plan::Series => Ok(Self::snapshot(symbol)),
                _ => Err(Self::error()),
            }
        }

        async fn fetch_price(
            &self,
            symbol: &Symbol,
        ) -> std::result::Result<PriceSnapshot, MarketDataError> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            match self.plan(symbol) {
                Plan::Price => Ok(Self::snapshot(symbol)),
                _ => Err(Self::error()),
            }
        }
    }

    // =========================================================================
    // Mock stores and analyzer
    // =========================================================================

    #[derive(Default)]
    struct MemoryExclusionStore {
        saved: Mutex<Vec<ExclusionEntry>>,
        saves: AtomicUsize,
    }

    impl ExclusionStore for MemoryExclusionStore {
        fn load(&self) -> Result<Vec<ExclusionEntry>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, entries: &[ExclusionEntry]) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.saved.lock().unwrap() = entries.to_vec();
            Ok(())
        }
    }

    /// Proposes LONG for every priced symbol.
    struct AlwaysLong;

    #[async_trait]
    impl SignalAnalyzer for AlwaysLong {
        fn name(&self) -> &'static str {
            "always-long"
        }

        async fn analyze(&self, report: &ScanReport) -> Result<Vec<CandidateSignal>> {
            Ok(report
                .successful
                .iter()
                .map(|p| CandidateSignal::new(p.symbol.clone(), Direction::Long, self.name()))
                .collect())
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    struct Harness {
        provider: Arc<MockProvider>,
        governor: Arc<RateBudgetGovernor>,
        registry: Arc<ExclusionRegistry>,
        clock: Arc<ManualClock>,
        orchestrator: Arc<ScanOrchestrator>,
    }

    fn harness(provider: MockProvider, budget: u32, concurrency: usize, batch: usize) -> Harness {
        harness_with_store(provider, budget, concurrency, batch, None)
    }

    fn harness_with_store(
        provider: MockProvider,
        budget: u32,
        concurrency: usize,
        batch: usize,
        store: Option<Arc<dyn ExclusionStore>>,
    ) -> Harness {
        let provider = Arc::new(provider);
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap(),
        ));
        let governor = Arc::new(RateBudgetGovernor::new(RateBudget {
            calls_per_window: budget,
            window: Duration::from_secs(60),
            penalty: Duration::from_secs(120),
        }));
        let fetcher = Arc::new(TierFallbackFetcher::new(
            provider.clone(),
            governor.clone(),
            Duration::from_secs(5),
        ));
        let registry = Arc::new(ExclusionRegistry::new(
            ExclusionPolicy {
                threshold: 3,
                backoff_schedule: vec![Duration::from_secs(900), Duration::from_secs(3600)],
            },
            clock.clone(),
        ));
        let mut orchestrator =
            ScanOrchestrator::new(fetcher, registry.clone(), clock.clone(), concurrency, batch);
        if let Some(store) = store {
            orchestrator = orchestrator.with_store(store);
        }
        Harness {
            provider,
            governor,
            registry,
            clock,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|n| Symbol::new(*n)).collect()
    }

    // =========================================================================
    // Orchestrator
    // =========================================================================

    #[tokio::test]
    async fn test_bulk_batches_counted_once() {
        let names = ["A", "B", "C", "D", "E"];
        let plans: Vec<(&str, Plan)> = names.iter().map(|n| (*n, Plan::Bulk)).collect();
        let h = harness(MockProvider::with_plans(&plans), 45, 4, 2);

        let report = h.orchestrator.run_scan_cycle(&symbols(&names)).await.unwrap();

        assert_eq!(report.successful.len(), 5);
        assert!(report.failed.is_empty());
        assert_eq!(h.provider.bulk_calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.total_calls_used, 3);
        assert_eq!(report.tier_distribution.get(&Tier::Bulk), Some(&5));
        assert_eq!(h.governor.granted_total(), 3);
    }

    #[tokio::test]
    async fn test_mixed_tiers_and_failures() {
        let provider = MockProvider::with_plans(&[
            ("BTC", Plan::Bulk),
            ("ETH", Plan::Series),
            ("SOL", Plan::Price),
            ("XYZ", Plan::Fail),
        ]);
        let h = harness(provider, 45, 4, 10);

        let report = h
            .orchestrator
            .run_scan_cycle(&symbols(&["BTC", "ETH", "SOL", "XYZ"]))
            .await
            .unwrap();

        let priced: Vec<&str> = report.successful.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(priced, vec!["BTC", "ETH", "SOL"]);
        assert_eq!(report.failed, symbols(&["XYZ"]));
        assert_eq!(report.tier_distribution.get(&Tier::Individual), Some(&1));
        assert_eq!(report.tier_distribution.get(&Tier::Price), Some(&1));
        // 1 bulk + ETH series + SOL series/price + XYZ series/price
        assert_eq!(report.total_calls_used, 6);
        assert_eq!(h.registry.entry(&Symbol::new("XYZ")).unwrap().failure_streak, 1);
        assert!(h.registry.entry(&Symbol::new("BTC")).is_none());
    }

    #[tokio::test]
    async fn test_cycle_completes_when_everything_fails() {
        let h = harness(MockProvider::default(), 45, 2, 5);
        let universe = symbols(&["A", "B", "C"]);

        let report = h.orchestrator.run_scan_cycle(&universe).await.unwrap();
        assert!(report.successful.is_empty());
        assert_eq!(report.failed, universe);
        assert_eq!(report.attempts.len(), 9);
        assert!(h.orchestrator.latest_report().is_some());
    }

    #[tokio::test]
    async fn test_empty_universe_returns_empty_report() {
        let h = harness(MockProvider::default(), 45, 2, 5);
        let report = h.orchestrator.run_scan_cycle(&[]).await.unwrap();
        assert_eq!(report.scanned(), 0);
        assert_eq!(report.total_calls_used, 0);
        assert_eq!(h.provider.bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_failure_excludes_symbol() {
        let h = harness(MockProvider::with_plans(&[("BTC", Plan::Bulk)]), 45, 2, 10);
        let universe = symbols(&["BTC", "XYZ"]);

        for _ in 0..3 {
            h.orchestrator.run_scan_cycle(&universe).await.unwrap();
        }
        let xyz = Symbol::new("XYZ");
        assert!(h.registry.is_excluded(&xyz));
        assert_eq!(
            h.registry.entry(&xyz).unwrap().expires_at,
            Some(h.clock.now() + chrono::Duration::seconds(900))
        );

        h.provider.requested.lock().unwrap().clear();
        let series_before = h.provider.series_calls.load(Ordering::SeqCst);
        let report = h.orchestrator.run_scan_cycle(&universe).await.unwrap();

        assert_eq!(report.excluded_count, 1);
        assert!(report.failed.is_empty());
        assert!(!h.provider.requested.lock().unwrap().contains(&xyz));
        assert_eq!(h.provider.series_calls.load(Ordering::SeqCst), series_before);

        // Expiry plus one success fully rehabilitates.
        h.clock.advance(chrono::Duration::seconds(900));
        h.provider.set_plan("XYZ", Plan::Price);
        let report = h.orchestrator.run_scan_cycle(&universe).await.unwrap();
        assert_eq!(report.excluded_count, 0);
        assert!(h.registry.entry(&xyz).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_is_respected() {
        let provider = MockProvider {
            series_delay: Duration::from_millis(500),
            ..MockProvider::with_plans(&[])
        };
        for i in 0..12 {
            provider.set_plan(&format!("S{}", i), Plan::Series);
        }
        let h = harness(provider, 1000, 3, 4);
        let universe: Vec<Symbol> = (0..12).map(|i| Symbol::new(format!("S{}", i))).collect();

        let report = h.orchestrator.run_scan_cycle(&universe).await.unwrap();
        assert_eq!(report.successful.len(), 12);
        assert!(h.provider.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(h.provider.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_budget_limits_calls_per_cycle() {
        let h = harness(MockProvider::with_plans(&[]), 2, 4, 10);
        let report = h
            .orchestrator
            .run_scan_cycle(&symbols(&["A", "B", "C", "D"]))
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 4);
        assert_eq!(report.total_calls_used, 2);
        assert_eq!(h.governor.granted_total(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_cycle_is_rejected() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let provider = MockProvider {
            gate: Some(gate.clone()),
            ..MockProvider::with_plans(&[("BTC", Plan::Bulk)])
        };
        let h = harness(provider, 45, 2, 10);
        let universe = symbols(&["BTC", "XYZ"]);

        let orchestrator = h.orchestrator.clone();
        let first_universe = universe.clone();
        let first =
            tokio::spawn(async move { orchestrator.run_scan_cycle(&first_universe).await });

        gate.entered.notified().await;
        assert!(h.orchestrator.is_running());
        let entries_before = h.registry.entries();

        let second = h.orchestrator.run_scan_cycle(&universe).await;
        assert_eq!(second.unwrap_err(), ScanError::CycleAlreadyRunning);
        assert_eq!(h.registry.entries(), entries_before);

        gate.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.successful.len(), 1);
        assert!(!h.orchestrator.is_running());
        assert_eq!(h.provider.bulk_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cycle_runs_as_spawned_task() {
        let h = harness(
            MockProvider::with_plans(&[("BTC", Plan::Bulk), ("ETH", Plan::Series)]),
            45,
            2,
            1,
        );
        let orchestrator = h.orchestrator.clone();
        let universe = symbols(&["BTC", "ETH"]);

        let report = tokio::spawn(async move { orchestrator.run_scan_cycle(&universe).await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.successful.len(), 2);
        assert_eq!(report.tier_distribution.get(&Tier::Bulk), Some(&1));
        assert_eq!(report.tier_distribution.get(&Tier::Individual), Some(&1));
    }

    #[tokio::test]
    async fn test_repeated_symbol_is_scanned_once() {
        let h = harness(MockProvider::default(), 45, 2, 10);

        let report = h
            .orchestrator
            .run_scan_cycle(&symbols(&["XYZ", "XYZ", "XYZ"]))
            .await
            .unwrap();

        assert_eq!(report.failed, symbols(&["XYZ"]));
        assert_eq!(h.provider.series_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.registry.entry(&Symbol::new("XYZ")).unwrap().failure_streak, 1);
        assert!(!h.registry.is_excluded(&Symbol::new("XYZ")));
    }

    #[tokio::test]
    async fn test_exclusions_persisted_after_cycle() {
        let store = Arc::new(MemoryExclusionStore::default());
        let h = harness_with_store(MockProvider::default(), 45, 2, 10, Some(store.clone()));

        h.orchestrator.run_scan_cycle(&symbols(&["XYZ"])).await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.saved.lock().unwrap()[0].failure_streak, 1);
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    fn scheduler(h: &Harness, names: &[&str]) -> (ScanScheduler, Arc<SignalCooldownArbiter>) {
        let arbiter = Arc::new(SignalCooldownArbiter::new(
            Duration::from_secs(300),
            h.clock.clone(),
        ));
        let pipeline = Arc::new(SignalPipeline::new(arbiter.clone(), Arc::new(LogAlertSink)));
        let scheduler = ScanScheduler::new(
            h.orchestrator.clone(),
            Arc::new(AlwaysLong),
            pipeline,
            SymbolUniverse::new(names.iter().copied()),
            Duration::from_secs(60),
        );
        (scheduler, arbiter)
    }

    #[tokio::test]
    async fn test_run_once_scans_and_arbitrates() {
        let h = harness(
            MockProvider::with_plans(&[("BTC", Plan::Bulk), ("ETH", Plan::Bulk)]),
            45,
            2,
            10,
        );
        let (scheduler, arbiter) = scheduler(&h, &["BTC", "ETH", "XYZ"]);

        let first = scheduler.run_once().await.unwrap();
        assert_eq!(first.report.successful.len(), 2);
        assert_eq!(first.signals.approved.len(), 2);
        assert_eq!(arbiter.entries().len(), 2);

        h.clock.advance(chrono::Duration::seconds(60));
        let second = scheduler.run_once().await.unwrap();
        assert!(second.signals.approved.is_empty());
        assert_eq!(second.signals.denied.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_ticks_until_shutdown() {
        let h = harness(MockProvider::with_plans(&[("BTC", Plan::Bulk)]), 1000, 2, 10);
        let (scheduler, _arbiter) = scheduler(&h, &["BTC"]);
        let scheduler = Arc::new(scheduler);
        let (tx, rx) = watch::channel(false);

        let runner = scheduler.clone();
        let handle = tokio::spawn(async move { runner.run(rx).await });

        // Immediate first tick, then one per 60s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(h.provider.bulk_calls.load(Ordering::SeqCst), 3);
    }
}
