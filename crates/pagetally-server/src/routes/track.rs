use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use pagetally_core::event::{RawEvent, TrackPayload};

use crate::state::AppState;

/// Tracking payloads are a handful of short strings.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// `POST /pagetally/v1/track`: record one page view.
///
/// ## Body
/// JSON `{token, path, queryString, browser}`, parsed regardless of the
/// declared content type: `navigator.sendBeacon` posts `text/plain`.
///
/// ## Response
/// Plain text only, never any detail about why a request failed:
/// - `200 "ok"` once the event is stored
/// - `400 "rejected"` for malformed bodies and every validation failure
/// - `500 "Error writing tracker event"` when storage fails
pub async fn track(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            info!(error = %e, "tracking body unreadable");
            return rejected();
        }
    };
    let mut payload: TrackPayload = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            info!(error = %e, "malformed tracking payload");
            return rejected();
        }
    };

    if payload.browser.trim().is_empty() {
        if let Some(browser) = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .and_then(browser_from_user_agent)
        {
            payload.browser = browser;
        }
    }

    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let raw = RawEvent {
        payload,
        origin: parts
            .headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        client_ip: client_ip(&parts.headers, remote),
    };

    match state.ingestor.track(raw).await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) if e.is_rejection() => {
            info!(reason = %e, "tracking event rejected");
            rejected()
        }
        Err(e) => {
            error!(error = %e, "failed to write tracking event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error writing tracker event",
            )
                .into_response()
        }
    }
}

fn rejected() -> Response {
    (StatusCode::BAD_REQUEST, "rejected").into_response()
}

/// Client address for geo resolution: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the socket peer. Empty when none is known.
pub fn client_ip(headers: &HeaderMap, remote: Option<IpAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| remote.map(|ip| ip.to_string()))
        .unwrap_or_default()
}

/// Browser family from a `User-Agent` header via `woothee`. Used only when
/// the script did not report one.
fn browser_from_user_agent(user_agent: &str) -> Option<String> {
    if user_agent.is_empty() {
        return None;
    }
    let result = woothee::parser::Parser::new().parse(user_agent)?;
    // woothee reports unclassified agents as "UNKNOWN".
    if result.name.is_empty() || result.name == "UNKNOWN" {
        return None;
    }
    Some(result.name.to_string())
}
