use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use pagetally_core::report::{Granularity, TimeWindow};
use pagetally_core::store::bounded;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Preset: `24h`, `1d`, `7d`, `30d` or `6m`. Ignored when `start`/`end`
    /// are given.
    pub range: Option<String>,
    /// RFC 3339 timestamps, inclusive.
    pub start: Option<String>,
    pub end: Option<String>,
    /// `hourly` or `daily`. Defaults from the window size or preset.
    pub granularity: Option<String>,
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| AppError::invalid_field(field, format!("{field} must be an RFC 3339 timestamp")))
}

/// Resolve the requested window and bucket size.
pub fn resolve_window(
    query: &ReportQuery,
    now: DateTime<Utc>,
) -> Result<(TimeWindow, Granularity), AppError> {
    let (window, default_granularity) = match (query.start.as_deref(), query.end.as_deref()) {
        (Some(start), Some(end)) => {
            let window = TimeWindow::new(
                parse_timestamp("start", start)?,
                parse_timestamp("end", end)?,
            )?;
            (window, window.suggested_granularity())
        }
        (None, None) => TimeWindow::from_preset(query.range.as_deref().unwrap_or("7d"), now),
        (Some(_), None) => return Err(AppError::invalid_field("end", "end is required with start")),
        (None, Some(_)) => return Err(AppError::invalid_field("start", "start is required with end")),
    };

    let granularity = match query.granularity.as_deref() {
        Some(raw) => Granularity::parse(raw)?,
        None => default_granularity,
    };

    Ok((window, granularity))
}

/// `GET /api/properties/{id}/reports`: views over time, top paths, browser
/// and country counts for one window.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (window, granularity) = resolve_window(&query, Utc::now())?;

    let property = bounded(
        state.config.storage_timeout(),
        state.store.get_property(&property_id),
    )
    .await?;
    if property.is_none() {
        return Err(AppError::NotFound("Property not found".to_string()));
    }

    let report = state
        .reports
        .dashboard(&property_id, window, granularity)
        .await?;

    Ok(Json(json!({ "data": report })))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0)
            .single()
            .expect("now")
    }

    fn query(pairs: &[(&str, &str)]) -> ReportQuery {
        let mut q = ReportQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "range" => q.range = v,
                "start" => q.start = v,
                "end" => q.end = v,
                "granularity" => q.granularity = v,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn defaults_to_last_seven_days() {
        let (window, granularity) = resolve_window(&query(&[]), now()).expect("window");
        assert_eq!(window.end, now());
        assert_eq!(window.start, now() - chrono::Duration::days(7));
        assert_eq!(granularity, Granularity::Daily);
    }

    #[test]
    fn explicit_window_suggests_granularity() {
        let q = query(&[("start", "2024-01-01T00:00:00Z"), ("end", "2024-01-01T23:59:59Z")]);
        let (window, granularity) = resolve_window(&q, now()).expect("window");
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("ts")
        );
        assert_eq!(granularity, Granularity::Hourly);

        let q = query(&[
            ("start", "2024-01-01T00:00:00+02:00"),
            ("end", "2024-01-05T00:00:00Z"),
            ("granularity", "hourly"),
        ]);
        let (window, granularity) = resolve_window(&q, now()).expect("window");
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2023, 12, 31, 22, 0, 0).single().expect("ts")
        );
        assert_eq!(granularity, Granularity::Hourly);
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(resolve_window(&query(&[("start", "2024-01-01T00:00:00Z")]), now()).is_err());
        assert!(resolve_window(&query(&[("start", "yesterday"), ("end", "today")]), now()).is_err());
        assert!(resolve_window(
            &query(&[("start", "2024-01-02T00:00:00Z"), ("end", "2024-01-01T00:00:00Z")]),
            now()
        )
        .is_err());
        assert!(resolve_window(&query(&[("granularity", "weekly")]), now()).is_err());
    }
}
