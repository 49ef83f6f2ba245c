use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pagetally_core::config::Config;
use pagetally_core::{Dialect, EventStore};
use pagetally_duckdb::DuckDbStore;
use pagetally_postgres::PgStore;

/// Open the storage backend selected by the connection string. An unknown
/// scheme fails here, before any query runs.
pub async fn open_store(config: &Config) -> Result<Arc<dyn EventStore>> {
    let dialect = Dialect::from_dsn(&config.dsn)?;
    let store: Arc<dyn EventStore> = match dialect {
        Dialect::DuckDb => Arc::new(DuckDbStore::open_dsn(
            &config.dsn,
            &config.duckdb_memory_limit,
        )?),
        Dialect::Postgres => Arc::new(PgStore::connect(&config.dsn).await?),
    };
    info!(dialect = %dialect, "storage ready");
    Ok(store)
}
