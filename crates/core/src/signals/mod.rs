//! Candidate signals and the cooldown arbiter that gates them.
//!
//! Every candidate goes through [`SignalCooldownArbiter`] before delivery.
//! The arbiter's check-and-record is atomic per symbol, so two producers
//! racing on one symbol can never both be approved.

mod analyzer;
mod arbiter;
mod delivery;
mod model;
mod pipeline;
mod store;

pub use analyzer::{NullAnalyzer, SignalAnalyzer};
pub use arbiter::SignalCooldownArbiter;
pub use delivery::{AlertSink, LogAlertSink};
pub use model::{CandidateSignal, CooldownEntry, DenialReason, Direction, PermissionDecision};
pub use pipeline::{PipelineOutcome, SignalPipeline};
pub use store::CooldownStore;
