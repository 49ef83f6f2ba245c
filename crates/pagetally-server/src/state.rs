use std::sync::Arc;

use anyhow::Result;

use pagetally_core::config::{AuthMode, Config};
use pagetally_core::{EventStore, GeoLookup, GeoResolver, Ingestor, ReportAggregator};

use crate::{auth, geo, storage};

/// Shared application state, built once in `main` and handed to every
/// handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn EventStore>,
    pub geo: Arc<GeoResolver>,
    pub ingestor: Ingestor,
    pub reports: ReportAggregator,
    admin_digest: Option<[u8; 32]>,
}

impl AppState {
    /// Wire the components together. Tests pass an in-memory store and a
    /// fake lookup here.
    pub fn new(config: Config, store: Arc<dyn EventStore>, lookup: Arc<dyn GeoLookup>) -> Self {
        let geo = Arc::new(GeoResolver::new(lookup, config.geo_cache_settings()));
        let ingestor = Ingestor::new(
            Arc::clone(&store),
            Arc::clone(&geo),
            config.storage_timeout(),
        );
        let reports = ReportAggregator::new(Arc::clone(&store), config.storage_timeout());
        let admin_digest = match &config.auth_mode {
            AuthMode::Password(password) => Some(auth::password_digest(password)),
            AuthMode::None => None,
        };

        Self {
            config,
            store,
            geo,
            ingestor,
            reports,
            admin_digest,
        }
    }

    /// Open storage and the geo lookup described by `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = storage::open_store(&config).await?;
        let lookup = geo::lookup_from_config(&config)?;
        Ok(Self::new(config, store, lookup))
    }

    pub(crate) fn admin_digest(&self) -> Option<&[u8; 32]> {
        self.admin_digest.as_ref()
    }
}
