//! Per-engine SQL fragments.
//!
//! The storage engine is picked once at startup from the connection string.
//! Every engine-specific piece of report SQL (date bucketing, placeholders,
//! timestamp parameters) comes from here, so query sites never branch on
//! the engine themselves.

use std::fmt;

use crate::error::CoreError;
use crate::report::Granularity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Embedded, file-based engine.
    DuckDb,
    /// Client-server engine.
    Postgres,
}

impl Dialect {
    /// Select the dialect from a connection string.
    ///
    /// - `file:…`, `duckdb:…`, or a bare path ending in `.db` / `.duckdb` → DuckDB
    /// - `postgres://…`, `postgresql://…` → PostgreSQL
    ///
    /// Anything else fails with [`CoreError::UnsupportedDialect`].
    pub fn from_dsn(dsn: &str) -> Result<Self, CoreError> {
        let dsn = dsn.trim();
        let lower = dsn.to_ascii_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if lower.starts_with("file:")
            || lower.starts_with("duckdb:")
            || lower.ends_with(".db")
            || lower.ends_with(".duckdb")
        {
            Ok(Dialect::DuckDb)
        } else {
            let scheme = dsn.split(':').next().unwrap_or_default();
            Err(CoreError::UnsupportedDialect(scheme.to_string()))
        }
    }

    /// Expression rendering `created_at` as a bucket label.
    ///
    /// Labels are identical across engines: `YYYY-MM-DD HH:00` for hourly and
    /// `YYYY-MM-DD` for daily buckets, both in UTC.
    pub fn bucket_expr(&self, granularity: Granularity) -> &'static str {
        match (self, granularity) {
            (Dialect::DuckDb, Granularity::Hourly) => "strftime(created_at, '%Y-%m-%d %H:00')",
            (Dialect::DuckDb, Granularity::Daily) => "strftime(created_at, '%Y-%m-%d')",
            (Dialect::Postgres, Granularity::Hourly) => {
                "to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:00')"
            }
            (Dialect::Postgres, Granularity::Daily) => {
                "to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD')"
            }
        }
    }

    /// Positional placeholder for the `n`th (1-based) bound parameter.
    pub fn param(&self, n: usize) -> String {
        match self {
            Dialect::DuckDb => format!("?{n}"),
            Dialect::Postgres => format!("${n}"),
        }
    }

    /// Placeholder for a timestamp parameter.
    ///
    /// DuckDB receives timestamps as text and casts them; PostgreSQL binds a
    /// native `timestamptz`.
    pub fn timestamp_param(&self, n: usize) -> String {
        match self {
            Dialect::DuckDb => format!("CAST(?{n} AS TIMESTAMP)"),
            Dialect::Postgres => format!("${n}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::DuckDb => "duckdb",
            Dialect::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
