//! Per-symbol chain diagnostics for logging and reports.

use crate::models::{FetchAttempt, FetchOutcome, Tier};

/// One line of a chain walk.
#[derive(Clone, Debug)]
pub struct TierTrace {
    pub tier: Tier,
    pub outcome: FetchOutcome,
    pub error: Option<String>,
    pub call_issued: bool,
}

/// Condensed view of every tier tried for one symbol.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub traces: Vec<TierTrace>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self { traces: Vec::new() }
    }

    pub fn from_attempts(attempts: &[FetchAttempt]) -> Self {
        let mut diag = Self::new();
        for attempt in attempts {
            diag.record(attempt);
        }
        diag
    }

    pub fn record(&mut self, attempt: &FetchAttempt) {
        self.traces.push(TierTrace {
            tier: attempt.tier,
            outcome: attempt.outcome,
            error: attempt.error.clone(),
            call_issued: attempt.call_issued,
        });
    }

    /// Summary for logging/debugging, e.g. `BULK: TIMEOUT -> INDIVIDUAL: SUCCESS`.
    pub fn summary(&self) -> String {
        self.traces
            .iter()
            .map(|t| format!("{}: {}", t.tier, t.outcome))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any tier succeeded.
    pub fn has_success(&self) -> bool {
        self.traces.iter().any(|t| t.outcome.is_success())
    }

    /// Provider calls spent by this chain alone.
    pub fn calls_issued(&self) -> usize {
        self.traces.iter().filter(|t| t.call_issued).count()
    }

    /// Get all errors.
    pub fn errors(&self) -> Vec<(Tier, &str)> {
        self.traces
            .iter()
            .filter_map(|t| t.error.as_deref().map(|e| (t.tier, e)))
            .collect()
    }
}
