use std::sync::Arc;

use log::{info, warn};
use tokio::task;

use super::arbiter::SignalCooldownArbiter;
use super::delivery::AlertSink;
use super::model::{CandidateSignal, DenialReason, PermissionDecision};
use super::store::CooldownStore;

/// What happened to one batch of candidates.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub approved: Vec<CandidateSignal>,
    pub denied: Vec<(CandidateSignal, DenialReason)>,
    /// Approved signals whose delivery failed. They stay approved.
    pub delivery_failures: usize,
}

/// Arbiter, then delivery, then one persist per batch.
pub struct SignalPipeline {
    arbiter: Arc<SignalCooldownArbiter>,
    sink: Arc<dyn AlertSink>,
    store: Option<Arc<dyn CooldownStore>>,
}

impl SignalPipeline {
    pub fn new(arbiter: Arc<SignalCooldownArbiter>, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            arbiter,
            sink,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CooldownStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn arbiter(&self) -> &Arc<SignalCooldownArbiter> {
        &self.arbiter
    }

    pub async fn process(&self, candidates: Vec<CandidateSignal>) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::default();

        for candidate in candidates {
            match self
                .arbiter
                .request_permission(&candidate.symbol, candidate.direction)
            {
                PermissionDecision::Approved => {
                    if let Err(e) = self.sink.deliver(&candidate).await {
                        warn!(
                            "Delivery of {} {} via '{}' failed: {}",
                            candidate.direction,
                            candidate.symbol,
                            self.sink.name(),
                            e
                        );
                        outcome.delivery_failures += 1;
                    }
                    outcome.approved.push(candidate);
                }
                PermissionDecision::Denied(reason) => {
                    let conflict = matches!(
                        reason,
                        DenialReason::WithinCooldown { conflict: true, .. }
                    );
                    if conflict {
                        info!(
                            "Dropped conflicting {} {} from '{}': {}",
                            candidate.direction, candidate.symbol, candidate.source, reason
                        );
                    } else {
                        info!(
                            "Dropped {} {} from '{}': {}",
                            candidate.direction, candidate.symbol, candidate.source, reason
                        );
                    }
                    outcome.denied.push((candidate, reason));
                }
            }
        }

        if !outcome.approved.is_empty() {
            self.persist().await;
        }
        outcome
    }

    /// Save arbiter state, dropping entries that no longer block anything.
    ///
    /// The store write runs on the blocking pool.
    pub async fn persist(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let arbiter = self.arbiter.clone();
        let result = task::spawn_blocking(move || {
            arbiter.prune_expired();
            arbiter.persist_to(store.as_ref())
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to persist cooldown state: {}", e),
            Err(e) => warn!("Cooldown persist task failed: {}", e),
        }
    }
}
