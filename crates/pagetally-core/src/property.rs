use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked site or app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    /// Hostname the tracking script's `Origin` must match.
    pub domain: String,
    /// Opaque credential embedded in the tracking script. Never changes.
    pub token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePropertyParams {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyParams {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub active: Option<bool>,
}

impl Property {
    /// Build a new, active property with a fresh id and token.
    pub fn new(params: CreatePropertyParams) -> Self {
        let now = Utc::now();
        Self {
            id: generate_property_id(),
            name: params.name,
            domain: params.domain,
            token: uuid::Uuid::new_v4().to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check a request `Origin` header value against the registered domain.
    ///
    /// Returns the offending hostname on mismatch. An origin that is absent,
    /// empty or not a URL with a host is accepted: server-to-server callers
    /// and privacy-stripping clients send none.
    pub fn check_origin(&self, origin: Option<&str>) -> Result<(), String> {
        let Some(origin) = origin.map(str::trim).filter(|o| !o.is_empty()) else {
            return Ok(());
        };
        let Ok(parsed) = url::Url::parse(origin) else {
            return Ok(());
        };
        let Some(host) = parsed.host_str() else {
            return Ok(());
        };

        // `Url` already lowercases the host; domains are compared without case.
        if host.eq_ignore_ascii_case(self.domain.trim()) {
            Ok(())
        } else {
            Err(host.to_string())
        }
    }
}

/// Generate a property ID: "prop_" + 10 random lowercase alphanumeric chars.
fn generate_property_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("prop_{}", chars)
}
