use demesne_fetch::FetchError;
use thiserror::Error;

/// Errors surfaced by domain loading and streaming.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("{operation} failed for domain {domain_id}")]
    Service {
        operation: String,
        domain_id: String,
        file_id: Option<String>,
        #[source]
        source: FetchError,
    },
}

impl DomainError {
    /// Maps a transport failure onto the domain vocabulary.
    ///
    /// Auth rejections, missing resources, timeouts, and cancellation keep
    /// their identity; anything else is wrapped with the operation context.
    pub(crate) fn from_fetch(
        err: FetchError,
        operation: &str,
        domain_id: &str,
        file_id: Option<&str>,
    ) -> Self {
        match err {
            FetchError::Status { status: 401 | 403, message } => {
                DomainError::Authentication(message)
            }
            FetchError::Status { status: 404, .. } => DomainError::NotFound(format!(
                "{operation}: domain {domain_id}{}",
                file_id.map(|id| format!(", file {id}")).unwrap_or_default()
            )),
            FetchError::Status { status, message } if status >= 500 => {
                DomainError::Network(format!("server returned {status}: {message}"))
            }
            FetchError::Network(message) => DomainError::Network(message),
            FetchError::Timeout => DomainError::Timeout,
            FetchError::Cancelled => DomainError::Cancelled,
            FetchError::Decode(message) => DomainError::Parse(message),
            other => DomainError::Service {
                operation: operation.to_string(),
                domain_id: domain_id.to_string(),
                file_id: file_id.map(str::to_string),
                source: other,
            },
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
