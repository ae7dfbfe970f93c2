//! Request credentials.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Credential attached to an outgoing request as an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// HTTP Basic: an application key/secret pair.
    Basic { key: String, secret: String },
    /// An opaque bearer token.
    Bearer(String),
}

impl Credential {
    /// Render the `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            Credential::Basic { key, secret } => {
                let encoded = STANDARD.encode(format!("{}:{}", key, secret));
                format!("Basic {}", encoded)
            }
            Credential::Bearer(token) => format!("Bearer {}", token),
        }
    }
}
