//! Analysis boundary: scan report in, candidate signals out.

use async_trait::async_trait;

use super::model::CandidateSignal;
use crate::errors::Result;
use crate::scanner::ScanReport;

/// Turns a scan report's prices into proposed alerts.
///
/// Indicator math lives behind this trait; the core never interprets it.
#[async_trait]
pub trait SignalAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, report: &ScanReport) -> Result<Vec<CandidateSignal>>;
}

/// Proposes nothing. Used when signals only arrive through the API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

#[async_trait]
impl SignalAnalyzer for NullAnalyzer {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn analyze(&self, _report: &ScanReport) -> Result<Vec<CandidateSignal>> {
        Ok(Vec::new())
    }
}
