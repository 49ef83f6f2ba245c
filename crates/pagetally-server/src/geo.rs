use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{info, warn};

use pagetally_core::config::{Config, MaxMindCredentials};
use pagetally_core::geo::{CountryLookup, DisabledLookup, GeoLookup, LookupError};

/// HTTP client for the MaxMind GeoIP2 / GeoLite2 web service.
///
/// Calls `GET {base_url}/country/{ip}` with HTTP basic auth (account id and
/// license key). Only the continent and country sections of the response are
/// decoded.
#[derive(Clone)]
pub struct MaxMindClient {
    client: Client,
    base_url: String,
    account_id: String,
    license_key: String,
}

impl MaxMindClient {
    pub fn new(base_url: &str, credentials: MaxMindCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pagetally/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building MaxMind HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: credentials.account_id,
            license_key: credentials.license_key,
        })
    }
}

#[async_trait]
impl GeoLookup for MaxMindClient {
    async fn country(&self, ip: &str) -> Result<CountryLookup, LookupError> {
        // The address comes from a client-controlled header and ends up in the
        // request path.
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?;

        let resp = self
            .client
            .get(format!("{}/country/{addr}", self.base_url))
            .basic_auth(&self.account_id, Some(&self.license_key))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        resp.json::<CountryLookup>()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}

/// Pick the geo lookup for this configuration. Without MaxMind credentials
/// events are stored with empty geography.
pub fn lookup_from_config(config: &Config) -> Result<Arc<dyn GeoLookup>> {
    match &config.maxmind {
        Some(credentials) => {
            let client = MaxMindClient::new(
                &config.maxmind_base_url,
                credentials.clone(),
                config.geo_timeout(),
            )?;
            info!(base_url = %config.maxmind_base_url, "MaxMind geo lookup enabled");
            Ok(Arc::new(client))
        }
        None => {
            warn!(
                "MaxMind credentials not set. Events are stored without geography. \
                 Set PAGETALLY_MAXMIND_ACCOUNT_ID and PAGETALLY_MAXMIND_LICENSE_KEY to enable it."
            );
            Ok(Arc::new(DisabledLookup))
        }
    }
}
