/// Error types for the fetch layer and the analytics facade

use thiserror::Error;

/// Failures at the upstream I/O boundary.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Upstream has no data at {0}")]
    NotFound(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::NotFound(_) | FetchError::InvalidUrl(_) | FetchError::Decode { .. } => false,
            FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// Errors surfaced by the analytics facade.
///
/// Missing or partial data is never an error here; it degrades to an
/// empty result. Only bad caller input and upstream failures end up as `Err`.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("At least {required} entities are required, got {actual}")]
    InsufficientEntities { required: usize, actual: usize },

    #[error("Upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
