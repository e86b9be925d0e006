use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::{main_lib::AppState, models::ExclusionsResponse};

async fn list_exclusions(State(state): State<Arc<AppState>>) -> Json<ExclusionsResponse> {
    let registry = state.registry();
    Json(ExclusionsResponse {
        stats: registry.stats(),
        entries: registry.entries(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/exclusions", get(list_exclusions))
}
