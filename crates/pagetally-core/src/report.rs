//! Report shapes and the SQL that produces them.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::CoreError;

/// Maximum number of rows returned by [`ReportSql::top_paths`].
pub const TOP_PATHS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim() {
            "hourly" | "hour" => Ok(Granularity::Hourly),
            "daily" | "day" => Ok(Granularity::Daily),
            other => Err(CoreError::UnsupportedGranularity(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

/// Closed interval `[start, end]` over event creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// Dashboard presets: `24h`, `1d` (yesterday), `7d`, `30d`, `6m`.
    /// Unknown values fall back to `7d`.
    pub fn from_preset(preset: &str, now: DateTime<Utc>) -> (Self, Granularity) {
        match preset {
            "24h" => (
                Self {
                    start: now - Duration::hours(24),
                    end: now,
                },
                Granularity::Hourly,
            ),
            "1d" => {
                let yesterday = (now - Duration::days(1)).date_naive();
                let start = yesterday.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
                (
                    Self {
                        start,
                        end: start + Duration::days(1) - Duration::seconds(1),
                    },
                    Granularity::Hourly,
                )
            }
            "30d" => (Self::months_back(now, 1), Granularity::Daily),
            "6m" => (Self::months_back(now, 6), Granularity::Daily),
            _ => (
                Self {
                    start: now - Duration::days(7),
                    end: now,
                },
                Granularity::Daily,
            ),
        }
    }

    fn months_back(now: DateTime<Utc>, months: u32) -> Self {
        let start = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(now - Duration::days(30 * i64::from(months)));
        Self { start, end: now }
    }

    /// Hourly buckets for windows of at most one day, daily otherwise.
    pub fn suggested_granularity(&self) -> Granularity {
        if self.end - self.start <= Duration::days(1) {
            Granularity::Hourly
        } else {
            Granularity::Daily
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewsOverTimeItem {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopPathItem {
    pub path: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserCountItem {
    pub browser: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCountItem {
    pub country: String,
    pub country_code: String,
    pub count: i64,
}

/// Everything the dashboard shows for one property and window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub window: TimeWindow,
    pub granularity: Granularity,
    pub views_over_time: Vec<ViewsOverTimeItem>,
    pub top_paths: Vec<TopPathItem>,
    pub browser_counts: Vec<BrowserCountItem>,
    pub country_counts: Vec<CountryCountItem>,
}

/// One grouped-count row as returned by a storage backend.
///
/// Every report statement selects exactly three columns: the grouping key,
/// a display label, and the event count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRow {
    pub key: String,
    pub label: String,
    pub count: i64,
}

/// Builds the report statements for one dialect.
///
/// Parameters are always bound in the same order: `1` property id, `2` window
/// start, `3` window end.
#[derive(Debug, Clone, Copy)]
pub struct ReportSql {
    dialect: Dialect,
}

impl ReportSql {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn scope(&self) -> String {
        format!(
            "property_id = {} AND created_at BETWEEN {} AND {}",
            self.dialect.param(1),
            self.dialect.timestamp_param(2),
            self.dialect.timestamp_param(3),
        )
    }

    pub fn views_over_time(&self, granularity: Granularity) -> String {
        let bucket = self.dialect.bucket_expr(granularity);
        format!(
            "SELECT {bucket} AS bucket, {bucket} AS label, COUNT(*) AS views \
             FROM events WHERE {scope} \
             GROUP BY 1, 2 ORDER BY 1 ASC",
            scope = self.scope(),
        )
    }

    pub fn top_paths(&self) -> String {
        format!(
            "SELECT path AS item, path AS label, COUNT(*) AS views \
             FROM events WHERE {scope} \
             GROUP BY path ORDER BY views DESC, item ASC LIMIT {TOP_PATHS_LIMIT}",
            scope = self.scope(),
        )
    }

    pub fn browser_counts(&self) -> String {
        format!(
            "SELECT browser AS item, browser AS label, COUNT(*) AS views \
             FROM events WHERE {scope} \
             GROUP BY browser ORDER BY views DESC, item ASC",
            scope = self.scope(),
        )
    }

    pub fn country_counts(&self) -> String {
        format!(
            "SELECT country_code AS item, MAX(country) AS label, COUNT(*) AS views \
             FROM events WHERE {scope} \
             GROUP BY country_code ORDER BY views DESC, item ASC",
            scope = self.scope(),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn granularity_parse() {
        assert_eq!(Granularity::parse("hourly").ok(), Some(Granularity::Hourly));
        assert_eq!(Granularity::parse("day").ok(), Some(Granularity::Daily));
        assert!(matches!(
            Granularity::parse("weekly"),
            Err(CoreError::UnsupportedGranularity(g)) if g == "weekly"
        ));
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        let now = at(2024, 1, 1, 12, 0);
        assert!(TimeWindow::new(now, now).is_ok());
        assert!(matches!(
            TimeWindow::new(now, now - Duration::seconds(1)),
            Err(CoreError::InvalidWindow)
        ));
    }

    #[test]
    fn presets() {
        let now = at(2024, 3, 31, 15, 30);

        let (w, g) = TimeWindow::from_preset("24h", now);
        assert_eq!((w.start, w.end, g), (at(2024, 3, 30, 15, 30), now, Granularity::Hourly));

        let (w, g) = TimeWindow::from_preset("1d", now);
        assert_eq!(w.start, at(2024, 3, 30, 0, 0));
        assert_eq!(w.end, at(2024, 3, 30, 23, 59) + Duration::seconds(59));
        assert_eq!(g, Granularity::Hourly);

        let (w, g) = TimeWindow::from_preset("30d", now);
        // Month arithmetic clamps to the last day of February.
        assert_eq!((w.start, g), (at(2024, 2, 29, 15, 30), Granularity::Daily));

        let (w, _) = TimeWindow::from_preset("6m", now);
        assert_eq!(w.start, at(2023, 9, 30, 15, 30));

        let (w, g) = TimeWindow::from_preset("bogus", now);
        assert_eq!((w.start, g), (at(2024, 3, 24, 15, 30), Granularity::Daily));
    }

    #[test]
    fn suggested_granularity_follows_window_size() {
        let now = at(2024, 1, 2, 0, 0);
        let day = TimeWindow::new(now - Duration::hours(24), now).expect("window");
        let week = TimeWindow::new(now - Duration::days(7), now).expect("window");
        assert_eq!(day.suggested_granularity(), Granularity::Hourly);
        assert_eq!(week.suggested_granularity(), Granularity::Daily);
    }

    #[test]
    fn statements_are_scoped_and_use_dialect_placeholders() {
        let duck = ReportSql::new(Dialect::DuckDb);
        let pg = ReportSql::new(Dialect::Postgres);

        let sql = duck.views_over_time(Granularity::Hourly);
        assert!(sql.contains("property_id = ?1"));
        assert!(sql.contains("BETWEEN CAST(?2 AS TIMESTAMP) AND CAST(?3 AS TIMESTAMP)"));
        assert!(sql.contains("strftime(created_at, '%Y-%m-%d %H:00')"));
        assert!(sql.ends_with("ORDER BY 1 ASC"));

        let sql = pg.views_over_time(Granularity::Daily);
        assert!(sql.contains("property_id = $1"));
        assert!(sql.contains("BETWEEN $2 AND $3"));
        assert!(sql.contains("'YYYY-MM-DD')"));
    }

    #[test]
    fn top_paths_is_limited_and_descending() {
        let sql = ReportSql::new(Dialect::Postgres).top_paths();
        assert!(sql.contains("ORDER BY views DESC"));
        assert!(sql.ends_with("LIMIT 10"));

        let sql = ReportSql::new(Dialect::DuckDb).browser_counts();
        assert!(sql.contains("ORDER BY views DESC"));
        assert!(!sql.contains("LIMIT"));
    }
}
