use std::collections::HashMap;
use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use signalgate_server::{api::app_router, build_state, config::Config};
use tempfile::tempdir;
use tower::ServiceExt;

fn test_config(db_path: &Path) -> Config {
    let db_path = db_path.to_string_lossy().to_string();
    let env: HashMap<&str, &str> = HashMap::from([
        ("SG_DB_PATH", db_path.as_str()),
        ("SG_PROVIDER_API_KEY", "test-key"),
        ("SG_PROVIDER_BASE_URL", "http://127.0.0.1:9"),
        ("SG_RATE_BUDGET", "8"),
        ("SG_RATE_WINDOW_SECS", "60"),
        ("SG_PENALTY_SECS", "60"),
        ("SG_EXCLUSION_THRESHOLD", "3"),
        ("SG_BACKOFF_SCHEDULE_SECS", "900,3600"),
        ("SG_COOLDOWN_SECS", "300"),
        ("SG_FETCH_CONCURRENCY", "4"),
        ("SG_TIER_TIMEOUT_MS", "500"),
        ("SG_BULK_BATCH_SIZE", "8"),
        ("SG_SCAN_INTERVAL_SECS", "60"),
    ]);
    Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_signal(symbol: &str, direction: &str) -> Request<Body> {
    let body = serde_json::json!({ "symbol": symbol, "direction": direction });
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/signals")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_works() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    let response = app.oneshot(get("/api/v1/healthz")).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn latest_report_is_not_found_before_first_cycle() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));
    let state = build_state(&config).await.unwrap();
    let app = app_router(state.clone(), &config);

    let (status, _) = send(&app, get("/api/v1/scan/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Empty universe: the cycle completes without any provider call.
    state.scheduler.run_once().await.unwrap();

    let (status, report) = send(&app, get("/api/v1/scan/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["totalCallsUsed"], 0);
    assert_eq!(report["successful"].as_array().unwrap().len(), 0);

    let (status, scanner) = send(&app, get("/api/v1/scan/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scanner["running"], false);
    assert_eq!(scanner["rateBudget"], 8);
}

#[tokio::test]
async fn exclusions_start_empty() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    let (status, body) = send(&app, get("/api/v1/exclusions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["tracked"], 0);
    assert_eq!(body["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn second_signal_within_cooldown_is_denied() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    let (status, first) = send(&app, post_signal("btc/usd", "LONG")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["approved"], true);
    assert_eq!(first["delivered"], true);
    assert_eq!(first["symbol"], "BTC/USD");

    let (status, second) = send(&app, post_signal("BTC/USD", "SHORT")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["approved"], false);
    assert_eq!(second["denial"]["conflict"], true);
    assert_eq!(second["denial"]["lastDirection"], "LONG");

    // Other symbols are independent.
    let (_, other) = send(&app, post_signal("ETH/USD", "NEUTRO")).await;
    assert_eq!(other["approved"], true);
    assert_eq!(other["direction"], "NEUTRAL");
}

#[tokio::test]
async fn cooldowns_survive_restart() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));

    {
        let state = build_state(&config).await.unwrap();
        let app = app_router(state, &config);
        let (_, first) = send(&app, post_signal("SOL/USD", "LONG")).await;
        assert_eq!(first["approved"], true);
    }

    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);
    let (_, again) = send(&app, post_signal("SOL/USD", "LONG")).await;
    assert_eq!(again["approved"], false);
    assert_eq!(again["denial"]["conflict"], false);
}

#[tokio::test]
async fn empty_symbol_is_rejected() {
    let tmp = tempdir().unwrap();
    let config = test_config(&tmp.path().join("test.db"));
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    let (status, body) = send(&app, post_signal("  ", "LONG")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}
