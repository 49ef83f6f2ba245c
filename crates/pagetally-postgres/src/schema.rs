/// PostgreSQL schema, applied with `sqlx::raw_sql` on every startup.
///
/// Timestamps are `TIMESTAMPTZ`; report bucketing converts to UTC explicitly
/// so labels do not depend on the session time zone.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    domain          TEXT NOT NULL,
    token           TEXT NOT NULL UNIQUE,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS events (
    id              TEXT PRIMARY KEY,
    property_id     TEXT NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
    path            TEXT NOT NULL,
    query_string    TEXT NOT NULL DEFAULT '',
    browser         TEXT NOT NULL DEFAULT '',
    country         TEXT NOT NULL DEFAULT '',
    country_code    TEXT NOT NULL DEFAULT '',
    continent       TEXT NOT NULL DEFAULT '',
    continent_code  TEXT NOT NULL DEFAULT '',
    created_at      TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_property_time ON events(property_id, created_at);
"#;
