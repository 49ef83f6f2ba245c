//! In-memory fakes shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::dialect::Dialect;
use crate::event::Event;
use crate::geo::{Continent, Country, CountryLookup, GeoLookup, LookupError};
use crate::property::{CreatePropertyParams, Property, UpdatePropertyParams};
use crate::report::{CountRow, TimeWindow};
use crate::store::EventStore;

pub(crate) struct MemoryStore {
    dialect: Dialect,
    pub properties: Mutex<Vec<Property>>,
    pub events: Mutex<Vec<Event>>,
    /// Rows returned by every `grouped_counts` call.
    pub rows: Mutex<Vec<CountRow>>,
    /// Statements passed to `grouped_counts`, in call order.
    pub statements: Mutex<Vec<String>>,
    pub fail_writes: AtomicBool,
    /// Sleep before answering every call.
    pub delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            properties: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            rows: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn add_property(&self, domain: &str, active: bool) -> Property {
        let mut property = Property::new(CreatePropertyParams {
            name: "Test".to_string(),
            domain: domain.to_string(),
        });
        property.active = active;
        self.properties
            .lock()
            .expect("lock")
            .push(property.clone());
        property
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().expect("lock").len()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("lock") = Some(delay);
    }

    async fn stall(&self) {
        let delay = *self.delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        self.stall().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.events.lock().expect("lock").push(event.clone());
        Ok(())
    }

    async fn grouped_counts(
        &self,
        sql: &str,
        _property_id: &str,
        _window: &TimeWindow,
    ) -> anyhow::Result<Vec<CountRow>> {
        self.stall().await;
        self.statements.lock().expect("lock").push(sql.to_string());
        Ok(self.rows.lock().expect("lock").clone())
    }

    async fn create_property(&self, params: CreatePropertyParams) -> anyhow::Result<Property> {
        let property = Property::new(params);
        self.properties
            .lock()
            .expect("lock")
            .push(property.clone());
        Ok(property)
    }

    async fn list_properties(&self, _name_filter: Option<&str>) -> anyhow::Result<Vec<Property>> {
        Ok(self.properties.lock().expect("lock").clone())
    }

    async fn get_property(&self, id: &str) -> anyhow::Result<Option<Property>> {
        Ok(self
            .properties
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_property_by_token(&self, token: &str) -> anyhow::Result<Option<Property>> {
        self.stall().await;
        Ok(self
            .properties
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.token == token)
            .cloned())
    }

    async fn update_property(
        &self,
        id: &str,
        params: UpdatePropertyParams,
    ) -> anyhow::Result<Option<Property>> {
        let mut properties = self.properties.lock().expect("lock");
        let Some(property) = properties.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = params.name {
            property.name = name;
        }
        if let Some(domain) = params.domain {
            property.domain = domain;
        }
        if let Some(active) = params.active {
            property.active = active;
        }
        property.updated_at = Utc::now();
        Ok(Some(property.clone()))
    }

    async fn delete_property(&self, id: &str) -> anyhow::Result<bool> {
        let mut properties = self.properties.lock().expect("lock");
        let before = properties.len();
        properties.retain(|p| p.id != id);
        self.events
            .lock()
            .expect("lock")
            .retain(|e| e.property_id != id);
        Ok(properties.len() != before)
    }
}

/// Geo lookup that answers every IP with Germany / Europe.
#[derive(Default)]
pub(crate) struct StaticLookup {
    pub calls: AtomicUsize,
}

impl StaticLookup {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoLookup for StaticLookup {
    async fn country(&self, _ip: &str) -> Result<CountryLookup, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CountryLookup {
            continent: Some(Continent {
                code: Some("EU".to_string()),
                names: BTreeMap::from([("en".to_string(), "Europe".to_string())]),
            }),
            country: Some(Country {
                iso_code: Some("DE".to_string()),
                names: BTreeMap::from([("en".to_string(), "Germany".to_string())]),
            }),
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
