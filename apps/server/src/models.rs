use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signalgate_core::exclusions::{ExclusionEntry, ExclusionStats};
use signalgate_core::signals::{CandidateSignal, DenialReason, Direction};
use signalgate_market_data::{GovernorStatus, Symbol};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSignal {
    pub symbol: String,
    pub direction: Direction,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl NewSignal {
    pub fn into_candidate(self) -> CandidateSignal {
        CandidateSignal::new(
            Symbol::new(&self.symbol),
            self.direction,
            self.source.unwrap_or_else(|| "api".to_string()),
        )
        .with_payload(self.payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    pub last_direction: Direction,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub conflict: bool,
    pub message: String,
}

impl From<&DenialReason> for Denial {
    fn from(reason: &DenialReason) -> Self {
        match reason {
            DenialReason::WithinCooldown {
                last_direction,
                elapsed,
                remaining,
                conflict,
            } => Self {
                last_direction: *last_direction,
                elapsed_secs: elapsed.as_secs(),
                remaining_secs: remaining.as_secs(),
                conflict: *conflict,
                message: reason.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalDecision {
    pub signal_id: Uuid,
    pub symbol: Symbol,
    pub direction: Direction,
    pub approved: bool,
    /// Approved but the sink failed. The approval still stands.
    pub delivered: bool,
    pub denial: Option<Denial>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionsResponse {
    pub stats: ExclusionStats,
    pub entries: Vec<ExclusionEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerStatus {
    pub running: bool,
    pub universe_size: usize,
    pub calls_in_window: u32,
    pub rate_budget: u32,
    pub blocked_for_secs: Option<u64>,
    pub granted_total: u64,
    pub last_cycle_finished_at: Option<DateTime<Utc>>,
}

impl ScannerStatus {
    pub fn new(
        running: bool,
        universe_size: usize,
        governor: GovernorStatus,
        last_cycle_finished_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            running,
            universe_size,
            calls_in_window: governor.calls_in_window,
            rate_budget: governor.budget,
            blocked_for_secs: governor.blocked_for.map(|d| d.as_secs()),
            granted_total: governor.granted_total,
            last_cycle_finished_at,
        }
    }
}
