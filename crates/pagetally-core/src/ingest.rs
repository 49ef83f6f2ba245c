//! Tracking ingestion: validate, enrich, store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::event::{normalize_query_string, Event, RawEvent};
use crate::geo::GeoResolver;
use crate::store::{bounded, EventStore};

/// Turns a raw tracking request into one stored [`Event`].
///
/// Checks run in a fixed order and the first failure wins: token present,
/// property exists, property active, origin matches. Nothing is written and no
/// geo lookup is made for a rejected request.
pub struct Ingestor {
    store: Arc<dyn EventStore>,
    geo: Arc<GeoResolver>,
    storage_timeout: Duration,
}

impl Ingestor {
    pub fn new(store: Arc<dyn EventStore>, geo: Arc<GeoResolver>, storage_timeout: Duration) -> Self {
        Self {
            store,
            geo,
            storage_timeout,
        }
    }

    pub async fn track(&self, raw: RawEvent) -> CoreResult<Event> {
        let RawEvent {
            payload,
            origin,
            client_ip,
        } = raw;

        let token = payload.token.trim();
        if token.is_empty() {
            return Err(CoreError::MissingToken);
        }

        let property = bounded(self.storage_timeout, self.store.get_property_by_token(token))
            .await?
            .ok_or(CoreError::PropertyNotFound)?;

        if !property.active {
            return Err(CoreError::PropertyInactive);
        }

        property
            .check_origin(origin.as_deref())
            .map_err(|origin| CoreError::OriginMismatch {
                origin,
                domain: property.domain.clone(),
            })?;

        let geo = self.geo.resolve(&client_ip).await;
        debug!(
            property_id = %property.id,
            country = %geo.country_code,
            "event enriched"
        );

        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            property_id: property.id,
            path: payload.path,
            query_string: normalize_query_string(&payload.query_string).to_string(),
            browser: payload.browser,
            country: geo.country_name,
            country_code: geo.country_code,
            continent: geo.continent_name,
            continent_code: geo.continent_code,
            created_at: Utc::now(),
        };

        bounded(self.storage_timeout, self.store.insert_event(&event)).await?;
        info!(property_id = %event.property_id, path = %event.path, "event stored");

        Ok(event)
    }
}
