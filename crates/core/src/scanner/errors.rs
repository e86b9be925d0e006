use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Overlapping cycles are rejected, never queued.
    #[error("A scan cycle is already running")]
    CycleAlreadyRunning,
}
