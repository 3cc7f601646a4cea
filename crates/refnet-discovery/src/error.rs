use serde::Serialize;
use thiserror::Error;

/// Failures reported by the places provider or ZIP geocoder.
///
/// Implementations must classify rate limiting structurally (status code or
/// error code), never by inspecting message text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacesError {
    /// Upstream quota exhausted. Never retried.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// Any other upstream failure.
    #[error("provider error: {message}")]
    Provider { message: String },
}

/// Failures from a storage-backed collaborator (database, snapshot files).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// External call usage over the trailing 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiUsage {
    pub calls_last_24h: u32,
    pub daily_limit: u32,
}

/// Errors that end a discovery search.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No clinic address/coordinates configured. Requires setup before searching.
    #[error("clinic location is not configured")]
    MissingClinicLocation,

    #[error("ZIP code '{0}' could not be located")]
    ZipNotFound(String),

    #[error("places provider rate limit reached: {message}")]
    RateLimited {
        message: String,
        usage: Option<ApiUsage>,
    },

    #[error("places provider failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<PlacesError> for DiscoveryError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::RateLimited { message } => DiscoveryError::RateLimited {
                message,
                usage: None,
            },
            PlacesError::Provider { message } => DiscoveryError::Provider(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SetupRequired,
    InvalidInput,
    RateLimited,
    ProviderError,
    Internal,
}

impl NotificationKind {
    /// Stable machine-readable code used in API error bodies.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            NotificationKind::SetupRequired => "setup_required",
            NotificationKind::InvalidInput => "validation_error",
            NotificationKind::RateLimited => "rate_limited",
            NotificationKind::ProviderError => "provider_error",
            NotificationKind::Internal => "internal_error",
        }
    }
}

/// User-facing message produced from a [`DiscoveryError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ApiUsage>,
}

impl DiscoveryError {
    /// Converts the error into the notification shown to the user.
    ///
    /// Internal details (storage errors) are not leaked into the message.
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            DiscoveryError::MissingClinicLocation => Notification {
                kind: NotificationKind::SetupRequired,
                title: "Clinic address required".to_string(),
                message: "Add your clinic address in settings before discovering nearby offices."
                    .to_string(),
                usage: None,
            },
            DiscoveryError::ZipNotFound(zip) => Notification {
                kind: NotificationKind::InvalidInput,
                title: "ZIP code not found".to_string(),
                message: format!("We couldn't locate ZIP code '{zip}'. Check it and try again."),
                usage: None,
            },
            DiscoveryError::RateLimited { usage, .. } => Notification {
                kind: NotificationKind::RateLimited,
                title: "Search limit reached".to_string(),
                message: "You've reached the discovery search limit. Please try again later."
                    .to_string(),
                usage: *usage,
            },
            DiscoveryError::Provider(_) => Notification {
                kind: NotificationKind::ProviderError,
                title: "Discovery failed".to_string(),
                message: "We couldn't load nearby offices right now. Please try again."
                    .to_string(),
                usage: None,
            },
            DiscoveryError::Storage(_) => Notification {
                kind: NotificationKind::Internal,
                title: "Something went wrong".to_string(),
                message: "Your search could not be completed. Please try again.".to_string(),
                usage: None,
            },
        }
    }
}
