//! HTTP client for the office discovery endpoint.
//!
//! One metered `POST /discover-offices` call per cache miss. Failures are
//! classified from the HTTP status and the envelope's `errorCode`, never from
//! message text.

use std::time::Duration;

use async_trait::async_trait;
use refnet_core::{AppConfig, RawPlace};
use refnet_discovery::{PlacesError, PlacesProvider, PlacesQuery};
use reqwest::{Client, StatusCode, Url};

use crate::error::PlacesApiError;
use crate::types::{DiscoverRequest, DiscoverResponse, RATE_LIMITED_CODE};

const DISCOVER_PATH: &str = "discover-offices";

/// HTTP settings shared by [`PlacesClient`] and [`crate::GeocodeClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.places_api_key.clone(),
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, PlacesApiError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// Ensures the base URL ends with exactly one slash so that `Url::join`
/// appends rather than replacing the last path segment.
pub(crate) fn normalise_base_url(base_url: &str) -> Result<Url, PlacesApiError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| PlacesApiError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

/// Maps a status code plus parsed body to an error, if either signals one.
pub(crate) fn check_api_error(
    status: StatusCode,
    body: &serde_json::Value,
) -> Result<(), PlacesApiError> {
    let message = body
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let error_code = body.get("errorCode").and_then(serde_json::Value::as_str);

    if status == StatusCode::TOO_MANY_REQUESTS || error_code == Some(RATE_LIMITED_CODE) {
        return Err(PlacesApiError::RateLimited(message));
    }
    if !status.is_success() {
        return Err(PlacesApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    if body.get("success").and_then(serde_json::Value::as_bool) != Some(true) {
        return Err(PlacesApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

/// Reads the body as JSON. A non-JSON body on an error status is reported
/// as that status rather than as a decode error.
pub(crate) async fn read_json(
    response: reqwest::Response,
    context: &str,
) -> Result<(StatusCode, serde_json::Value), PlacesApiError> {
    let status = response.status();
    let text = response.text().await?;
    match serde_json::from_str(&text) {
        Ok(value) => Ok((status, value)),
        Err(_) if !status.is_success() => Ok((status, serde_json::Value::Null)),
        Err(e) => Err(PlacesApiError::Deserialize {
            context: context.to_string(),
            source: e,
        }),
    }
}

/// Client for the office discovery provider.
///
/// Use [`PlacesClient::from_config`] in the binaries or
/// [`PlacesClient::with_base_url`] to point at a mock server in tests.
pub struct PlacesClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl PlacesClient {
    /// # Errors
    ///
    /// Returns [`PlacesApiError`] if the HTTP client cannot be built or the
    /// configured URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, PlacesApiError> {
        Self::with_base_url(
            &config.places_api_url,
            &ClientSettings::from_app_config(config),
        )
    }

    /// # Errors
    ///
    /// Returns [`PlacesApiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PlacesApiError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(base_url: &str, settings: &ClientSettings) -> Result<Self, PlacesApiError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: settings.api_key.clone(),
            base_url: normalise_base_url(base_url)?,
        })
    }

    fn discover_url(&self) -> Result<Url, PlacesApiError> {
        self.base_url
            .join(DISCOVER_PATH)
            .map_err(|e| PlacesApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Calls the discovery endpoint and returns the provider's office list.
    ///
    /// # Errors
    ///
    /// - [`PlacesApiError::RateLimited`] on HTTP 429 or `errorCode: "rate_limited"`.
    /// - [`PlacesApiError::Api`] on any other non-2xx status or `success: false`.
    /// - [`PlacesApiError::Http`] on network failure.
    /// - [`PlacesApiError::Deserialize`] if the body does not match the envelope.
    pub async fn discover(&self, query: &PlacesQuery) -> Result<Vec<RawPlace>, PlacesApiError> {
        let request = DiscoverRequest {
            clinic_id: query.clinic_id,
            distance: query.distance_miles,
            search_lat: query.origin.lat,
            search_lng: query.origin.lng,
            office_type_filter: query.office_type_filter.as_deref(),
            zip_code_override: query.zip_code_override.as_deref(),
        };

        let mut builder = self.client.post(self.discover_url()?).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let (status, body) = read_json(response, DISCOVER_PATH).await?;
        check_api_error(status, &body)?;

        let envelope: DiscoverResponse =
            serde_json::from_value(body).map_err(|e| PlacesApiError::Deserialize {
                context: format!("{DISCOVER_PATH}(distance={})", query.distance_miles),
                source: e,
            })?;

        tracing::debug!(
            clinic_id = %query.clinic_id,
            distance = query.distance_miles,
            offices = envelope.offices.len(),
            upstream_cached = envelope.cached,
            new_offices = envelope.new_offices_count,
            session_id = envelope.session_id.as_deref(),
            "places provider responded"
        );

        Ok(envelope.offices.into_iter().map(RawPlace::from).collect())
    }
}

#[async_trait]
impl PlacesProvider for PlacesClient {
    async fn search(&self, query: &PlacesQuery) -> Result<Vec<RawPlace>, PlacesError> {
        self.discover(query).await.map_err(PlacesError::from)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
