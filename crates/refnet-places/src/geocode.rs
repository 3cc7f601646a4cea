//! ZIP code geocoding for search-origin overrides.

use async_trait::async_trait;
use refnet_core::{AppConfig, Coordinates};
use refnet_discovery::{PlacesError, ZipGeocoder};
use reqwest::{Client, StatusCode, Url};

use crate::client::{check_api_error, normalise_base_url, read_json, ClientSettings};
use crate::error::PlacesApiError;
use crate::types::{GeocodeResponse, NOT_FOUND_CODE};

const GEOCODE_PATH: &str = "geocode";

pub struct GeocodeClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl GeocodeClient {
    /// # Errors
    ///
    /// Returns [`PlacesApiError`] if the HTTP client cannot be built or the
    /// configured URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, PlacesApiError> {
        Self::with_base_url(
            &config.geocode_api_url,
            &ClientSettings::from_app_config(config),
        )
    }

    /// # Errors
    ///
    /// Returns [`PlacesApiError`] if the HTTP client cannot be built or
    /// `base_url` does not parse.
    pub fn with_base_url(base_url: &str, settings: &ClientSettings) -> Result<Self, PlacesApiError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: settings.api_key.clone(),
            base_url: normalise_base_url(base_url)?,
        })
    }

    fn build_url(&self, zip5: &str) -> Result<Url, PlacesApiError> {
        let mut url = self
            .base_url
            .join(GEOCODE_PATH)
            .map_err(|e| PlacesApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut().append_pair("zip", zip5);
        Ok(url)
    }

    /// Resolves a 5-digit ZIP to coordinates. `Ok(None)` when the ZIP is
    /// unknown (HTTP 404 or `errorCode: "not_found"`).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesApiError`] for network, status or decode failures.
    pub async fn lookup(&self, zip5: &str) -> Result<Option<Coordinates>, PlacesApiError> {
        let mut builder = self.client.get(self.build_url(zip5)?);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let (status, body) = read_json(response, GEOCODE_PATH).await?;

        let not_found = status == StatusCode::NOT_FOUND
            || body.get("errorCode").and_then(serde_json::Value::as_str) == Some(NOT_FOUND_CODE);
        if not_found {
            tracing::debug!(zip = zip5, "geocoder has no location for ZIP");
            return Ok(None);
        }
        check_api_error(status, &body)?;

        let parsed: GeocodeResponse =
            serde_json::from_value(body).map_err(|e| PlacesApiError::Deserialize {
                context: format!("{GEOCODE_PATH}(zip={zip5})"),
                source: e,
            })?;
        Ok(Coordinates::from_parts(parsed.lat, parsed.lng))
    }
}

#[async_trait]
impl ZipGeocoder for GeocodeClient {
    async fn geocode_zip(&self, zip5: &str) -> Result<Option<Coordinates>, PlacesError> {
        self.lookup(zip5).await.map_err(PlacesError::from)
    }
}
