use std::time::Duration;

use crate::geo::GeoCacheSettings;

pub const DEFAULT_MAXMIND_BASE_URL: &str = "https://geolite.info/geoip/v2.1";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Storage connection string. The prefix selects the SQL dialect, see
    /// [`crate::dialect::Dialect::from_dsn`].
    pub dsn: String,
    pub duckdb_memory_limit: String,
    pub maxmind: Option<MaxMindCredentials>,
    pub maxmind_base_url: String,
    pub geo_cache_ttl_secs: u64,
    pub geo_cache_capacity: u64,
    pub geo_timeout_ms: u64,
    pub storage_timeout_ms: u64,
    pub auth_mode: AuthMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaxMindCredentials {
    pub account_id: String,
    pub license_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    None,
    /// Holds the plaintext password value read from `PAGETALLY_ADMIN_PASSWORD`.
    Password(String),
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. `from_env` delegates
    /// here so parsing can be tested without touching process-global state.
    pub fn from_lookup<F>(get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let maxmind = match (
            non_empty("PAGETALLY_MAXMIND_ACCOUNT_ID"),
            non_empty("PAGETALLY_MAXMIND_LICENSE_KEY"),
        ) {
            (Some(account_id), Some(license_key)) => Some(MaxMindCredentials {
                account_id,
                license_key,
            }),
            (None, None) => None,
            _ => {
                return Err(
                    "PAGETALLY_MAXMIND_ACCOUNT_ID and PAGETALLY_MAXMIND_LICENSE_KEY must be set together"
                        .to_string(),
                )
            }
        };

        Ok(Self {
            port: parse_or(&get, "PAGETALLY_PORT", 3000)?,
            dsn: get("PAGETALLY_DSN").unwrap_or_else(|| "file:./data/pagetally.db".to_string()),
            duckdb_memory_limit: get("PAGETALLY_DUCKDB_MEMORY")
                .unwrap_or_else(|| "1GB".to_string()),
            maxmind,
            maxmind_base_url: get("PAGETALLY_MAXMIND_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MAXMIND_BASE_URL.to_string()),
            geo_cache_ttl_secs: parse_or(&get, "PAGETALLY_GEO_CACHE_TTL_SECS", 12 * 60 * 60)?,
            geo_cache_capacity: parse_or(&get, "PAGETALLY_GEO_CACHE_CAPACITY", 10_000)?,
            geo_timeout_ms: parse_or(&get, "PAGETALLY_GEO_TIMEOUT_MS", 2_000)?,
            storage_timeout_ms: parse_or(&get, "PAGETALLY_STORAGE_TIMEOUT_MS", 5_000)?,
            auth_mode: match non_empty("PAGETALLY_ADMIN_PASSWORD") {
                Some(pw) => AuthMode::Password(pw),
                None => AuthMode::None,
            },
        })
    }

    pub fn geo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.geo_cache_ttl_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn geo_cache_settings(&self) -> GeoCacheSettings {
        GeoCacheSettings {
            ttl: self.geo_cache_ttl(),
            capacity: self.geo_cache_capacity,
            lookup_timeout: self.geo_timeout(),
        }
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid {key}: {e}")),
        None => Ok(default),
    }
}
