use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pagetally_core::config::Config;
use pagetally_core::geo::DisabledLookup;
use pagetally_duckdb::DuckDbStore;
use pagetally_server::app::build_app;
use pagetally_server::state::AppState;

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

#[tokio::test]
async fn test_health_returns_200_when_db_reachable() {
    let db = DuckDbStore::open_in_memory().expect("in-memory DuckDB");
    let config = Config::from_lookup(|_| None).expect("default config");
    let state = Arc::new(AppState::new(config, Arc::new(db), Arc::new(DisabledLookup)));
    let app = build_app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["storage"], "duckdb");
}

#[tokio::test]
async fn test_state_from_config_rejects_unknown_dsn() {
    let config = Config::from_lookup(|key| {
        (key == "PAGETALLY_DSN").then(|| "mysql://localhost/pagetally".to_string())
    })
    .expect("config");

    let err = AppState::from_config(config).await.err().expect("must fail");
    assert!(err.to_string().contains("unsupported database dialect"));
}

#[tokio::test]
async fn test_state_from_config_opens_in_memory_duckdb() {
    let config = Config::from_lookup(|key| {
        (key == "PAGETALLY_DSN").then(|| "duckdb::memory:".to_string())
    })
    .expect("config");

    let state = AppState::from_config(config).await.expect("state");
    assert_eq!(state.store.dialect().name(), "duckdb");
    assert_eq!(state.geo.provider_name(), "disabled");
}
