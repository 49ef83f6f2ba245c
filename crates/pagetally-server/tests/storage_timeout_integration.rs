use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pagetally_core::config::Config;
use pagetally_core::dialect::Dialect;
use pagetally_core::event::Event;
use pagetally_core::geo::DisabledLookup;
use pagetally_core::property::{CreatePropertyParams, Property, UpdatePropertyParams};
use pagetally_core::report::{CountRow, TimeWindow};
use pagetally_core::EventStore;
use pagetally_server::app::build_app;
use pagetally_server::state::AppState;

/// A store whose every call hangs, like a stuck database connection.
struct HangingStore;

#[async_trait]
impl EventStore for HangingStore {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    async fn ping(&self) -> anyhow::Result<()> {
        std::future::pending().await
    }

    async fn insert_event(&self, _event: &Event) -> anyhow::Result<()> {
        std::future::pending().await
    }

    async fn grouped_counts(
        &self,
        _sql: &str,
        _property_id: &str,
        _window: &TimeWindow,
    ) -> anyhow::Result<Vec<CountRow>> {
        std::future::pending().await
    }

    async fn create_property(&self, _params: CreatePropertyParams) -> anyhow::Result<Property> {
        std::future::pending().await
    }

    async fn list_properties(&self, _name_filter: Option<&str>) -> anyhow::Result<Vec<Property>> {
        std::future::pending().await
    }

    async fn get_property(&self, _id: &str) -> anyhow::Result<Option<Property>> {
        std::future::pending().await
    }

    async fn get_property_by_token(&self, _token: &str) -> anyhow::Result<Option<Property>> {
        std::future::pending().await
    }

    async fn update_property(
        &self,
        _id: &str,
        _params: UpdatePropertyParams,
    ) -> anyhow::Result<Option<Property>> {
        std::future::pending().await
    }

    async fn delete_property(&self, _id: &str) -> anyhow::Result<bool> {
        std::future::pending().await
    }
}

fn setup() -> axum::Router {
    let mut config = Config::from_lookup(|_| None).expect("default config");
    config.storage_timeout_ms = 50;
    let state = Arc::new(AppState::new(
        config,
        Arc::new(HangingStore),
        Arc::new(DisabledLookup),
    ));
    build_app(state)
}

/// Send a request and require an answer well before the test deadline.
async fn send(app: axum::Router, method: &str, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let response = tokio::time::timeout(Duration::from_secs(5), app.oneshot(request))
        .await
        .expect("handler must give up on a hung store")
        .expect("request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

fn error_code(bytes: &[u8]) -> Value {
    let json: Value = serde_json::from_slice(bytes).expect("parse JSON");
    json["error"]["code"].clone()
}

#[tokio::test]
async fn test_reports_give_up_on_hung_property_lookup() {
    let (status, body) = send(
        setup(),
        "GET",
        "/api/properties/prop_x/reports?range=7d",
        "",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "internal_error");
}

#[tokio::test]
async fn test_property_api_gives_up_on_hung_store() {
    let app = setup();

    let (status, _) = send(app.clone(), "GET", "/api/properties", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(app.clone(), "GET", "/api/properties/prop_x", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/properties",
        r#"{"name":"Site","domain":"mysite.com"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(app.clone(), "PUT", "/api/properties/prop_x", r#"{"active":false}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(app, "DELETE", "/api/properties/prop_x", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_tracking_gives_up_on_hung_store() {
    let (status, body) = send(
        setup(),
        "POST",
        "/pagetally/v1/track",
        r#"{"token":"00000000-0000-4000-8000-000000000000","path":"/"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Error writing tracker event");
}

#[tokio::test]
async fn test_health_degrades_on_hung_store() {
    let (status, body) = send(setup(), "GET", "/health", "").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).expect("parse JSON");
    assert_eq!(json["status"], "degraded");
}
