/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `PAGETALLY_DUCKDB_MEMORY`, default `"1GB"`). The DuckDB default of
/// 80% of system RAM is not acceptable for a server process.
///
/// DuckDB does not cascade deletes. `delete_property` removes events first,
/// then the property, inside one transaction.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- PROPERTIES
-- ===========================================
CREATE TABLE IF NOT EXISTS properties (
    id              VARCHAR PRIMARY KEY,           -- 'prop_' + 10 random chars
    name            VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    token           VARCHAR NOT NULL UNIQUE,       -- UUID v4, embedded in the tracking script
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- EVENTS (append-only, one row per page view)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR PRIMARY KEY,
    property_id     VARCHAR NOT NULL,
    path            VARCHAR NOT NULL,
    query_string    VARCHAR NOT NULL DEFAULT '',   -- without leading '?'
    browser         VARCHAR NOT NULL DEFAULT '',
    country         VARCHAR NOT NULL DEFAULT '',
    country_code    VARCHAR NOT NULL DEFAULT '',
    continent       VARCHAR NOT NULL DEFAULT '',
    continent_code  VARCHAR NOT NULL DEFAULT '',
    created_at      TIMESTAMP NOT NULL             -- UTC
);
CREATE INDEX IF NOT EXISTS idx_events_property_time ON events(property_id, created_at);
"#
    )
}
