use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{Denial, NewSignal, SignalDecision},
};

/// Submit one candidate through the cooldown arbiter.
///
/// Approved signals are delivered before the response is sent.
async fn submit_signal(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewSignal>,
) -> ApiResult<Json<SignalDecision>> {
    if payload.symbol.trim().is_empty() {
        return Err(ApiError::BadRequest("symbol must not be empty".to_string()));
    }

    let candidate = payload.into_candidate();
    let (signal_id, symbol, direction) =
        (candidate.id, candidate.symbol.clone(), candidate.direction);

    let outcome = state.pipeline.process(vec![candidate]).await;

    let decision = match outcome.denied.first() {
        Some((_, reason)) => SignalDecision {
            signal_id,
            symbol,
            direction,
            approved: false,
            delivered: false,
            denial: Some(Denial::from(reason)),
        },
        None => SignalDecision {
            signal_id,
            symbol,
            direction,
            approved: true,
            delivered: outcome.delivery_failures == 0,
            denial: None,
        },
    };
    Ok(Json(decision))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/signals", post(submit_signal))
}
