//! Error types for demesne-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timeout")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("response decode failed: {0}")]
    Decode(String),
}

impl FetchError {
    /// Default retryability classification.
    ///
    /// Connectivity failures, HTTP 5xx, HTTP 429, and timeouts are worth
    /// retrying. Auth rejections (401/403) and other 4xx statuses are not;
    /// neither are cancellation or a body that failed to decode.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidUrl(_)
            | FetchError::InvalidRequest(_)
            | FetchError::Cancelled
            | FetchError::Decode(_) => false,
        }
    }

    /// HTTP status code, when the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
