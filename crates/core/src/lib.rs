//! SignalGate Core - scan orchestration, exclusions and signal arbitration.
//!
//! This crate contains the scanner's business logic. It is
//! database-agnostic and defines store traits that are implemented by the
//! `storage-sqlite` crate.

pub mod errors;
pub mod exclusions;
pub mod scanner;
pub mod settings;
pub mod signals;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
