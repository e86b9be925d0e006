use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::errors::ScanError;
use super::orchestrator::ScanOrchestrator;
use super::report::ScanReport;
use super::universe::SymbolUniverse;
use crate::errors::{Error, Result};
use crate::signals::{PipelineOutcome, SignalAnalyzer, SignalPipeline};

/// Everything one scheduled cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub report: Arc<ScanReport>,
    pub signals: PipelineOutcome,
}

/// Interval loop around scan, analyze and the signal pipeline.
pub struct ScanScheduler {
    orchestrator: Arc<ScanOrchestrator>,
    analyzer: Arc<dyn SignalAnalyzer>,
    pipeline: Arc<SignalPipeline>,
    universe: SymbolUniverse,
    interval: Duration,
}

impl ScanScheduler {
    pub fn new(
        orchestrator: Arc<ScanOrchestrator>,
        analyzer: Arc<dyn SignalAnalyzer>,
        pipeline: Arc<SignalPipeline>,
        universe: SymbolUniverse,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            analyzer,
            pipeline,
            universe,
            interval,
        }
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// Drive exactly one cycle: scan, analyze, arbitrate and deliver.
    ///
    /// Analyzer errors are logged and treated as "no candidates".
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let report = self
            .orchestrator
            .run_scan_cycle(self.universe.symbols())
            .await?;

        let candidates = match self.analyzer.analyze(&report).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Analyzer '{}' failed: {}", self.analyzer.name(), e);
                Vec::new()
            }
        };
        debug!(
            "Analyzer '{}' proposed {} signals",
            self.analyzer.name(),
            candidates.len()
        );

        let signals = self.pipeline.process(candidates).await;
        Ok(CycleOutcome { report, signals })
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first tick fires immediately. Shutdown is observed between
    /// cycles; an in-flight cycle is never interrupted.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Scan scheduler started ({}s interval, {} symbols)",
            self.interval.as_secs(),
            self.universe.len()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scan scheduler stopped");
    }

    async fn tick(&self) {
        match self.run_once().await {
            Ok(outcome) => debug!(
                "Cycle {} done: {} approved, {} denied",
                outcome.report.cycle_id,
                outcome.signals.approved.len(),
                outcome.signals.denied.len()
            ),
            Err(Error::Scan(ScanError::CycleAlreadyRunning)) => {
                info!("Skipping scheduled scan: previous cycle still running");
            }
            Err(e) => warn!("Scheduled scan failed: {}", e),
        }
    }
}
