//! Background scan scheduler.
//!
//! Runs scan cycles on the configured interval until shutdown is signalled.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::main_lib::AppState;

/// Starts the scan loop. Send `true` on the returned channel to stop it
/// after the in-flight cycle.
pub fn start_scan_scheduler(state: Arc<AppState>) -> (watch::Sender<bool>, JoinHandle<()>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = state.scheduler.clone();

    let handle = tokio::spawn(async move {
        info!(
            "Scan scheduler starting with {} symbols",
            scheduler.universe().len()
        );
        scheduler.run(shutdown_rx).await;
    });

    (shutdown_tx, handle)
}
