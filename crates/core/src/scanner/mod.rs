//! Scan cycles and the loop that drives them.
//!
//! - `orchestrator` - One cycle: partition, fetch, record, report
//! - `scheduler` - Interval loop: scan, analyze, arbitrate, persist
//! - `universe` - The symbol list being scanned
//! - `report` - Per-cycle results

mod errors;
mod orchestrator;
mod report;
mod scheduler;
mod universe;

#[cfg(test)]
mod orchestrator_tests;

pub use errors::ScanError;
pub use orchestrator::ScanOrchestrator;
pub use report::{ScanReport, SymbolPrice};
pub use scheduler::{CycleOutcome, ScanScheduler};
pub use universe::SymbolUniverse;
