use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The payload the tracking script sends to `POST /pagetally/v1/track`.
///
/// Every field is optional on the wire. A missing token deserializes to the
/// empty string and is rejected by the ingestor, not by the JSON layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackPayload {
    pub token: String,
    pub path: String,
    pub query_string: String,
    pub browser: String,
}

/// A tracking request as handed over by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub payload: TrackPayload,
    /// Value of the `Origin` request header, if any.
    pub origin: Option<String>,
    pub client_ip: String,
}

/// The enriched, stored page view. Mirrors the `events` table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub property_id: String,
    pub path: String,
    /// Never starts with `?`.
    pub query_string: String,
    pub browser: String,
    pub country: String,
    pub country_code: String,
    pub continent: String,
    pub continent_code: String,
    pub created_at: DateTime<Utc>,
}

/// Strip the leading `?` from a query string.
///
/// Repeated leading `?` are all removed, so the result never starts with one
/// and applying the function again is a no-op.
pub fn normalize_query_string(raw: &str) -> &str {
    // Strips every leading `?`, not just one: `??a` becomes `a`.
    raw.trim_start_matches('?')
}
