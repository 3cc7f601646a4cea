//! Wire types for the places and geocoding endpoints.

use refnet_core::{Coordinates, RawPlace};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const RATE_LIMITED_CODE: &str = "rate_limited";
pub(crate) const NOT_FOUND_CODE: &str = "not_found";

/// Request body for `POST /discover-offices`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest<'a> {
    pub clinic_id: Uuid,
    pub distance: u32,
    pub search_lat: f64,
    pub search_lng: f64,
    pub office_type_filter: Option<&'a str>,
    pub zip_code_override: Option<&'a str>,
}

/// Response envelope for `POST /discover-offices`.
///
/// `success`, `error` and `errorCode` are checked on the raw JSON before
/// this type is decoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub offices: Vec<PlaceRecord>,
    #[serde(default)]
    pub new_offices_count: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub office_type: Option<String>,
}

impl From<PlaceRecord> for RawPlace {
    fn from(record: PlaceRecord) -> Self {
        RawPlace {
            coordinates: Coordinates::from_parts(record.lat, record.lng),
            place_id: record.place_id,
            name: record.name,
            address: record.address,
            phone: record.phone,
            website: record.website,
            rating: record.rating,
            raw_type_label: record.office_type,
        }
    }
}

/// Response from `GET /geocode?zip=`.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}
