use crate::error::DomainError;

/// Connection settings for a domain service deployment.
///
/// `api_server` issues service tokens, `dds_server` brokers per-domain
/// access. Both are origin URLs without trailing paths.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_server: String,
    pub dds_server: String,
    pub app_key: String,
    pub app_secret: String,
    pub client_id: String,
}

impl ClientConfig {
    pub(crate) fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("api_server", &self.api_server),
            ("dds_server", &self.dds_server),
            ("app_key", &self.app_key),
            ("app_secret", &self.app_secret),
            ("client_id", &self.client_id),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DomainError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}
