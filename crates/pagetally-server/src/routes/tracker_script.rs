use axum::{http::header, response::IntoResponse};

const TRACKER_JS: &str = include_str!("../../assets/tracker.js");

/// `GET /pagetally/v1/tracker.js`: the embeddable tracking script.
pub async fn tracker_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        TRACKER_JS,
    )
}
