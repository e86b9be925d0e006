//! Delivery of approved alerts.

use async_trait::async_trait;
use log::info;

use super::model::CandidateSignal;
use crate::errors::Result;

/// Destination for approved signals (chat bot, webhook, file, ...).
///
/// A failed delivery does not undo the approval.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, signal: &CandidateSignal) -> Result<()>;
}

/// Writes approved signals to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, signal: &CandidateSignal) -> Result<()> {
        info!(
            "ALERT {} {} from '{}' at {} payload={}",
            signal.direction,
            signal.symbol,
            signal.source,
            signal.proposed_at.to_rfc3339(),
            signal.payload
        );
        Ok(())
    }
}
