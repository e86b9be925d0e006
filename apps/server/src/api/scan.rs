use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use signalgate_core::scanner::ScanReport;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::ScannerStatus,
};

/// Report of the last completed cycle.
async fn latest_report(State(state): State<Arc<AppState>>) -> ApiResult<Json<ScanReport>> {
    let report = state
        .orchestrator
        .latest_report()
        .ok_or(ApiError::NotFound)?;
    Ok(Json(report.as_ref().clone()))
}

async fn scanner_status(State(state): State<Arc<AppState>>) -> Json<ScannerStatus> {
    let last = state.orchestrator.latest_report().map(|r| r.finished_at);
    Json(ScannerStatus::new(
        state.orchestrator.is_running(),
        state.scheduler.universe().len(),
        state.governor.status(),
        last,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scan/latest", get(latest_report))
        .route("/scan/status", get(scanner_status))
}
