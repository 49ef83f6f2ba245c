use anyhow::Result;
use chrono::Utc;

use pagetally_core::property::{CreatePropertyParams, Property, UpdatePropertyParams};

use crate::backend::{from_db_timestamp, to_db_timestamp};
use crate::DuckDbStore;

const SELECT_PROPERTY: &str = "SELECT id, name, domain, token, active, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR) FROM properties";

/// Raw column values; timestamps are parsed outside the row callback so
/// parse failures surface as `anyhow` errors.
struct PropertyRow {
    id: String,
    name: String,
    domain: String,
    token: String,
    active: bool,
    created_at: String,
    updated_at: String,
}

impl PropertyRow {
    fn read(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            domain: row.get(2)?,
            token: row.get(3)?,
            active: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_property(self) -> Result<Property> {
        Ok(Property {
            id: self.id,
            name: self.name,
            domain: self.domain,
            token: self.token,
            active: self.active,
            created_at: from_db_timestamp(&self.created_at)?,
            updated_at: from_db_timestamp(&self.updated_at)?,
        })
    }
}

fn query_one(
    conn: &duckdb::Connection,
    sql: &str,
    param: &str,
) -> Result<Option<Property>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt
        .query_map(duckdb::params![param], PropertyRow::read)?
        .next()
        .transpose()?;
    row.map(PropertyRow::into_property).transpose()
}

impl DuckDbStore {
    pub async fn create_property(&self, params: CreatePropertyParams) -> Result<Property> {
        let property = Property::new(params);
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO properties (id, name, domain, token, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, CAST(?6 AS TIMESTAMP), CAST(?7 AS TIMESTAMP))",
            duckdb::params![
                property.id,
                property.name,
                property.domain,
                property.token,
                property.active,
                to_db_timestamp(&property.created_at),
                to_db_timestamp(&property.updated_at),
            ],
        )?;
        // Read back so the returned timestamps carry storage precision.
        query_one(&conn, &format!("{SELECT_PROPERTY} WHERE id = ?1"), &property.id)?
            .ok_or_else(|| anyhow::anyhow!("property {} missing after insert", property.id))
    }

    /// Properties ordered by lower-cased name, optionally filtered by a
    /// case-insensitive substring of the name.
    pub async fn list_properties(&self, name_filter: Option<&str>) -> Result<Vec<Property>> {
        let conn = self.conn.lock().await;
        let filter = name_filter.map(str::trim).filter(|f| !f.is_empty());

        let rows = match filter {
            Some(filter) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_PROPERTY} WHERE contains(lower(name), lower(?1)) \
                     ORDER BY lower(name), id"
                ))?;
                let rows = stmt
                    .query_map(duckdb::params![filter], PropertyRow::read)?
                    .collect::<duckdb::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_PROPERTY} ORDER BY lower(name), id"))?;
                let rows = stmt
                    .query_map([], PropertyRow::read)?
                    .collect::<duckdb::Result<Vec<_>>>()?;
                rows
            }
        };

        rows.into_iter().map(PropertyRow::into_property).collect()
    }

    pub async fn get_property(&self, id: &str) -> Result<Option<Property>> {
        let conn = self.conn.lock().await;
        query_one(&conn, &format!("{SELECT_PROPERTY} WHERE id = ?1"), id)
    }

    pub async fn get_property_by_token(&self, token: &str) -> Result<Option<Property>> {
        let conn = self.conn.lock().await;
        query_one(&conn, &format!("{SELECT_PROPERTY} WHERE token = ?1"), token)
    }

    /// Apply the provided fields. The token is never changed.
    pub async fn update_property(
        &self,
        id: &str,
        params: UpdatePropertyParams,
    ) -> Result<Option<Property>> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE properties SET \
                 name = COALESCE(?1, name), \
                 domain = COALESCE(?2, domain), \
                 active = COALESCE(?3, active), \
                 updated_at = CAST(?4 AS TIMESTAMP) \
             WHERE id = ?5",
            duckdb::params![
                params.name,
                params.domain,
                params.active,
                to_db_timestamp(&Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        query_one(&conn, &format!("{SELECT_PROPERTY} WHERE id = ?1"), id)
    }

    /// Delete a property and its events in one transaction.
    ///
    /// DuckDB doesn't enforce cascades, so events go first.
    pub async fn delete_property(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let exists: i64 = tx
            .prepare("SELECT COUNT(*) FROM properties WHERE id = ?1")?
            .query_row(duckdb::params![id], |row| row.get(0))?;
        if exists == 0 {
            return Ok(false);
        }

        let events = tx.execute("DELETE FROM events WHERE property_id = ?1", duckdb::params![id])?;
        tx.execute("DELETE FROM properties WHERE id = ?1", duckdb::params![id])?;
        tx.commit()?;

        tracing::info!(property_id = id, events, "property deleted");
        Ok(true)
    }
}
