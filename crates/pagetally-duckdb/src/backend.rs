use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use pagetally_core::event::Event;
use pagetally_core::report::{CountRow, TimeWindow};

use crate::schema::init_sql;

/// Timestamps are stored as naive UTC `TIMESTAMP` values and bound as text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `CAST(ts AS VARCHAR)` output. DuckDB omits the fraction when it is
/// zero, which `%.f` accepts.
pub(crate) fn from_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid timestamp from DuckDB: {raw}"))
}

/// Extract the database path from a `file:` / `duckdb:` connection string.
/// Query parameters are ignored.
pub fn dsn_path(dsn: &str) -> &str {
    let dsn = dsn.trim();
    let rest = dsn
        .strip_prefix("duckdb:")
        .or_else(|| dsn.strip_prefix("file:"))
        .unwrap_or(dsn);
    rest.split('?').next().unwrap_or(rest)
}

/// The embedded storage engine.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection is wrapped in `Arc<Mutex<_>>` so every
/// statement is serialised while the store stays cheaply shareable across
/// Axum handlers.
pub struct DuckDbStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Missing parent directories are created.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating data directory {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(path, memory_limit, "DuckDB opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** database. Data is discarded on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open from a connection string such as `file:./data/pagetally.db`.
    /// `file::memory:` and an empty path open an in-memory database.
    pub fn open_dsn(dsn: &str, memory_limit: &str) -> Result<Self> {
        match dsn_path(dsn) {
            "" | ":memory:" => Self::open_in_memory(),
            path => Self::open(path, memory_limit),
        }
    }

    /// Insert one event. A single statement is atomic in DuckDB, so no
    /// explicit transaction is needed.
    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO events (
                id, property_id, path, query_string, browser,
                country, country_code, continent, continent_code,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                CAST(?10 AS TIMESTAMP)
            )"#,
            duckdb::params![
                event.id,
                event.property_id,
                event.path,
                event.query_string,
                event.browser,
                event.country,
                event.country_code,
                event.continent,
                event.continent_code,
                to_db_timestamp(&event.created_at),
            ],
        )?;
        Ok(())
    }

    /// Run a three-column report statement scoped to one property and window.
    pub async fn grouped_counts(
        &self,
        sql: &str,
        property_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CountRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(
            duckdb::params![
                property_id,
                to_db_timestamp(&window.start),
                to_db_timestamp(&window.end),
            ],
            |row| {
                Ok(CountRow {
                    key: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    label: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    count: row.get(2)?,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn dsn_path_strips_scheme_and_query() {
        assert_eq!(dsn_path("file:./data/pagetally.db"), "./data/pagetally.db");
        assert_eq!(dsn_path("file:events.db?mode=rwc"), "events.db");
        assert_eq!(dsn_path("duckdb::memory:"), ":memory:");
        assert_eq!(dsn_path("/var/lib/pagetally.duckdb"), "/var/lib/pagetally.duckdb");
    }

    #[test]
    fn timestamps_survive_the_text_form() {
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 1, 10, 15, 0)
            .single()
            .expect("ts");
        assert_eq!(to_db_timestamp(&ts), "2024-01-01 10:15:00.000000");
        assert_eq!(from_db_timestamp("2024-01-01 10:15:00").expect("parse"), ts);
        assert_eq!(
            from_db_timestamp("2024-01-01 10:15:00.000000").expect("parse"),
            ts
        );
        assert!(from_db_timestamp("yesterday").is_err());
    }
}
