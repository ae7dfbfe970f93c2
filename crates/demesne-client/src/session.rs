use chrono::{DateTime, Utc};
use demesne_fetch::Credential;
use serde::Deserialize;

/// Response from the service-level token grant.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainServerInfo {
    pub url: String,
    #[serde(default)]
    pub ip: Option<String>,
}

/// Response from the per-domain auth exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct DomainAuthResponse {
    pub access_token: String,
    pub domain_server: DomainServerInfo,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An authenticated session against one domain's asset server.
///
/// Holds the domain-scoped bearer token and the server origin the token is
/// valid for. All asset URLs are derived from here.
#[derive(Debug, Clone)]
pub struct DomainSession {
    pub domain_id: String,
    pub domain_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    access_token: String,
    server_base_url: String,
}

impl DomainSession {
    pub(crate) fn new(domain_id: String, auth: DomainAuthResponse) -> Self {
        Self {
            domain_id,
            domain_name: auth.name,
            created_at: auth.created_at,
            updated_at: auth.updated_at,
            access_token: auth.access_token,
            server_base_url: auth.domain_server.url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_base_url(&self) -> &str {
        &self.server_base_url
    }

    pub(crate) fn credential(&self) -> Credential {
        Credential::Bearer(self.access_token.clone())
    }

    pub(crate) fn data_listing_url(&self) -> String {
        format!(
            "{}/api/v1/domains/{}/data",
            self.server_base_url, self.domain_id
        )
    }

    pub(crate) fn item_url(&self, item_id: &str) -> String {
        format!(
            "{}/api/v1/domains/{}/data/{}?raw=1",
            self.server_base_url, self.domain_id, item_id
        )
    }

    pub(crate) fn lighthouses_url(&self) -> String {
        format!(
            "{}/api/v1/domains/{}/lighthouses",
            self.server_base_url, self.domain_id
        )
    }
}
