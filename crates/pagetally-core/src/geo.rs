//! IP → coarse geography resolution.
//!
//! [`GeoResolver`] wraps any [`GeoLookup`] with a TTL cache keyed by the raw IP
//! string. The cache uses `moka`'s `get_with`, so concurrent misses for the
//! same key run the lookup once and every waiter receives that one result.
//! Failures are cached too (as `None`) so a failing IP is not re-queried on
//! every event inside the TTL.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Response body of the country lookup endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryLookup {
    #[serde(default)]
    pub continent: Option<Continent>,
    #[serde(default)]
    pub country: Option<Country>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    #[serde(default)]
    pub code: Option<String>,
    /// Language code → localized name. Sorted, so the fallback pick is stable.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub iso_code: Option<String>,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// Resolved geography attached to an event. Empty strings mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geography {
    pub country_name: String,
    pub country_code: String,
    pub continent_name: String,
    pub continent_code: String,
}

impl Geography {
    pub fn from_lookup(lookup: &CountryLookup) -> Self {
        let (country_name, country_code) = lookup
            .country
            .as_ref()
            .map(|c| (preferred_name(&c.names), c.iso_code.clone().unwrap_or_default()))
            .unwrap_or_default();
        let (continent_name, continent_code) = lookup
            .continent
            .as_ref()
            .map(|c| (preferred_name(&c.names), c.code.clone().unwrap_or_default()))
            .unwrap_or_default();

        Self {
            country_name,
            country_code,
            continent_name,
            continent_code,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// English name when present, otherwise the first name by language key.
fn preferred_name(names: &BTreeMap<String, String>) -> String {
    names
        .get("en")
        .or_else(|| names.values().next())
        .cloned()
        .unwrap_or_default()
}

/// Failure of the external lookup. Never reaches the tracking caller.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Transport(String),

    #[error("lookup service returned status {0}")]
    Status(u16),

    #[error("lookup response could not be decoded: {0}")]
    Decode(String),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("not an IP address: {0}")]
    InvalidAddress(String),

    #[error("geo lookup is not configured")]
    Disabled,
}

/// External IP geolocation service.
#[async_trait]
pub trait GeoLookup: Send + Sync + 'static {
    async fn country(&self, ip: &str) -> Result<CountryLookup, LookupError>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Lookup used when no geolocation credentials are configured.
pub struct DisabledLookup;

#[async_trait]
impl GeoLookup for DisabledLookup {
    async fn country(&self, _ip: &str) -> Result<CountryLookup, LookupError> {
        Err(LookupError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeoCacheSettings {
    pub ttl: Duration,
    pub capacity: u64,
    /// Upper bound for one external call.
    pub lookup_timeout: Duration,
}

impl Default for GeoCacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 60 * 60),
            capacity: 10_000,
            lookup_timeout: Duration::from_secs(2),
        }
    }
}

/// `true` for addresses that never leave the machine and need no lookup.
pub fn is_local_address(ip: &str) -> bool {
    if ip.is_empty() || ip.eq_ignore_ascii_case("localhost") {
        return true;
    }
    ip.parse::<IpAddr>().map(|a| a.is_loopback()).unwrap_or(false)
}

pub struct GeoResolver {
    lookup: Arc<dyn GeoLookup>,
    /// `None` marks a cached failure.
    cache: Cache<String, Option<Arc<CountryLookup>>>,
    lookup_timeout: Duration,
}

impl GeoResolver {
    pub fn new(lookup: Arc<dyn GeoLookup>, settings: GeoCacheSettings) -> Self {
        let cache = Cache::builder()
            .time_to_live(settings.ttl)
            .max_capacity(settings.capacity)
            .build();

        Self {
            lookup,
            cache,
            lookup_timeout: settings.lookup_timeout,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.lookup.name()
    }

    /// Resolve `ip` to geography. Never fails: unknown, local, or failed
    /// lookups all yield empty geography.
    pub async fn resolve(&self, ip: &str) -> Geography {
        let ip = ip.trim();
        if is_local_address(ip) {
            debug!(ip, "skipping geo lookup for local address");
            return Geography::default();
        }

        let cached = self
            .cache
            .get_with(ip.to_string(), async {
                debug!(ip, provider = self.lookup.name(), "geo cache miss");
                match self.fetch(ip).await {
                    Ok(lookup) => Some(Arc::new(lookup)),
                    Err(LookupError::Disabled) => None,
                    Err(e) => {
                        warn!(ip, error = %e, "geo lookup failed, caching empty result");
                        None
                    }
                }
            })
            .await;

        cached
            .map(|lookup| Geography::from_lookup(&lookup))
            .unwrap_or_default()
    }

    async fn fetch(&self, ip: &str) -> Result<CountryLookup, LookupError> {
        match tokio::time::timeout(self.lookup_timeout, self.lookup.country(ip)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.lookup_timeout)),
        }
    }
}
