use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signalgate_market_data::Symbol;
use uuid::Uuid;

/// Direction of a proposed alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    /// Accepts the legacy spelling `NEUTRO` on input.
    #[serde(alias = "NEUTRO")]
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// True when the two directions point opposite ways.
    ///
    /// `NEUTRAL` never conflicts.
    pub fn conflicts_with(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Self::Long, Self::Short) | (Self::Short, Self::Long)
        )
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            "NEUTRAL" | "NEUTRO" => Ok(Self::Neutral),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

/// An alert proposed by an analysis stage, not yet approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSignal {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub symbol: Symbol,
    pub direction: Direction,
    #[serde(default = "Utc::now")]
    pub proposed_at: DateTime<Utc>,
    /// Producer tag, e.g. the analyzer's name.
    #[serde(default)]
    pub source: String,
    /// Opaque to the core; passed through to delivery.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CandidateSignal {
    pub fn new(symbol: Symbol, direction: Direction, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            direction,
            proposed_at: Utc::now(),
            source: source.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// The most recently approved alert for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub symbol: Symbol,
    pub last_direction: Direction,
    pub last_approved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// A previous alert for the symbol was approved less than one cooldown ago.
    WithinCooldown {
        last_direction: Direction,
        elapsed: Duration,
        remaining: Duration,
        /// The request flips direction against the last approved alert.
        conflict: bool,
    },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinCooldown {
                last_direction,
                elapsed,
                remaining,
                conflict,
            } => {
                if *conflict {
                    write!(
                        f,
                        "direction conflict with {} approved {}s ago ({}s remaining)",
                        last_direction,
                        elapsed.as_secs(),
                        remaining.as_secs()
                    )
                } else {
                    write!(
                        f,
                        "within cooldown of {} approved {}s ago ({}s remaining)",
                        last_direction,
                        elapsed.as_secs(),
                        remaining.as_secs()
                    )
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Approved,
    Denied(DenialReason),
}

impl PermissionDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serde() {
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"LONG\"");
        assert_eq!(
            serde_json::from_str::<Direction>("\"NEUTRO\"").unwrap(),
            Direction::Neutral
        );
        assert_eq!(
            serde_json::from_str::<Direction>("\"NEUTRAL\"").unwrap(),
            Direction::Neutral
        );
        assert!(serde_json::from_str::<Direction>("\"UP\"").is_err());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("short".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!(" neutro ".parse::<Direction>().unwrap(), Direction::Neutral);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_conflicts() {
        assert!(Direction::Long.conflicts_with(Direction::Short));
        assert!(Direction::Short.conflicts_with(Direction::Long));
        assert!(!Direction::Long.conflicts_with(Direction::Long));
        assert!(!Direction::Neutral.conflicts_with(Direction::Short));
    }

    #[test]
    fn test_candidate_defaults_on_deserialize() {
        let signal: CandidateSignal =
            serde_json::from_str(r#"{"symbol": "btc/usd", "direction": "LONG"}"#).unwrap();
        assert_eq!(signal.symbol.as_str(), "BTC/USD");
        assert_eq!(signal.source, "");
        assert!(signal.payload.is_null());
    }
}
