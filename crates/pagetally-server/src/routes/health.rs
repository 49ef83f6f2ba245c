use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use pagetally_core::store::bounded;

use crate::state::AppState;

/// `GET /health`: liveness check.
///
/// Returns `200 OK` when storage answers a ping and `503 Service Unavailable`
/// otherwise.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0", "storage": "duckdb" }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.store.dialect().name();
    match bounded(state.config.storage_timeout(), state.store.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": storage,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, storage, "Health check: storage unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "storage": storage,
                })),
            )
                .into_response()
        }
    }
}
