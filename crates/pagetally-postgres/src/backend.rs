use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use pagetally_core::event::Event;
use pagetally_core::property::{CreatePropertyParams, Property, UpdatePropertyParams};
use pagetally_core::report::{CountRow, TimeWindow};

use crate::schema::SCHEMA_SQL;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_PROPERTY: &str =
    "SELECT id, name, domain, token, active, created_at, updated_at FROM properties";

fn property_from_row(row: &PgRow) -> Result<Property, sqlx::Error> {
    Ok(Property {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        token: row.try_get("token")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// The client-server storage engine.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `database_url` and create the schema if it is missing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        let store = Self::from_pool(pool);
        store.init_schema().await?;
        info!(max_connections = MAX_CONNECTIONS, "PostgreSQL connected");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO events (
                id, property_id, path, query_string, browser,
                country, country_code, continent, continent_code,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&event.id)
        .bind(&event.property_id)
        .bind(&event.path)
        .bind(&event.query_string)
        .bind(&event.browser)
        .bind(&event.country)
        .bind(&event.country_code)
        .bind(&event.continent)
        .bind(&event.continent_code)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn grouped_counts(
        &self,
        sql: &str,
        property_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CountRow>> {
        let rows = sqlx::query(sql)
            .bind(property_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await?;

        let counts = rows
            .iter()
            .map(|row| -> Result<CountRow, sqlx::Error> {
                Ok(CountRow {
                    key: row.try_get::<Option<String>, _>(0)?.unwrap_or_default(),
                    label: row.try_get::<Option<String>, _>(1)?.unwrap_or_default(),
                    count: row.try_get(2)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    pub async fn create_property(&self, params: CreatePropertyParams) -> Result<Property> {
        let property = Property::new(params);
        let row = sqlx::query(
            "INSERT INTO properties (id, name, domain, token, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, name, domain, token, active, created_at, updated_at",
        )
        .bind(&property.id)
        .bind(&property.name)
        .bind(&property.domain)
        .bind(&property.token)
        .bind(property.active)
        .bind(property.created_at)
        .bind(property.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(property_from_row(&row)?)
    }

    pub async fn list_properties(&self, name_filter: Option<&str>) -> Result<Vec<Property>> {
        let rows = match name_filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(filter) => {
                sqlx::query(&format!(
                    "{SELECT_PROPERTY} WHERE strpos(lower(name), lower($1)) > 0 \
                     ORDER BY lower(name), id"
                ))
                .bind(filter)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_PROPERTY} ORDER BY lower(name), id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn get_property(&self, id: &str) -> Result<Option<Property>> {
        let row = sqlx::query(&format!("{SELECT_PROPERTY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(property_from_row).transpose()?)
    }

    pub async fn get_property_by_token(&self, token: &str) -> Result<Option<Property>> {
        let row = sqlx::query(&format!("{SELECT_PROPERTY} WHERE token = $1"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(property_from_row).transpose()?)
    }

    pub async fn update_property(
        &self,
        id: &str,
        params: UpdatePropertyParams,
    ) -> Result<Option<Property>> {
        let row = sqlx::query(
            "UPDATE properties SET \
                 name = COALESCE($1, name), \
                 domain = COALESCE($2, domain), \
                 active = COALESCE($3, active), \
                 updated_at = $4 \
             WHERE id = $5 \
             RETURNING id, name, domain, token, active, created_at, updated_at",
        )
        .bind(params.name)
        .bind(params.domain)
        .bind(params.active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(property_from_row).transpose()?)
    }

    /// Delete a property and its events in one transaction.
    pub async fn delete_property(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let events = sqlx::query("DELETE FROM events WHERE property_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted > 0 {
            info!(property_id = id, events, "property deleted");
        }
        Ok(deleted > 0)
    }
}
