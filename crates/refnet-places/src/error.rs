use refnet_discovery::PlacesError;
use thiserror::Error;

/// Errors returned by the places and geocoding HTTP clients.
#[derive(Debug, Error)]
pub enum PlacesApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider refused the call because the quota is exhausted
    /// (HTTP 429 or `errorCode: "rate_limited"`).
    #[error("places API rate limited: {0}")]
    RateLimited(String),

    /// Non-2xx status or `success: false` envelope.
    #[error("places API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<PlacesApiError> for PlacesError {
    fn from(err: PlacesApiError) -> Self {
        match err {
            PlacesApiError::RateLimited(message) => PlacesError::RateLimited { message },
            other => PlacesError::Provider {
                message: other.to_string(),
            },
        }
    }
}
