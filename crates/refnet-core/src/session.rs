//! Search parameters and discovery session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::office::Coordinates;
use crate::CoreError;

/// Where a search origin came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "zip", rename_all = "snake_case")]
pub enum OriginSource {
    /// The clinic's stored address.
    Clinic,
    /// A ZIP code supplied for this search only.
    ZipOverride(String),
}

/// The point distances are measured from for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOrigin {
    pub coordinates: Coordinates,
    pub source: OriginSource,
}

/// Inputs for one discovery search. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryParameters {
    distance_miles: u32,
    zip_code_override: Option<String>,
    office_type_filter: Option<String>,
}

impl DiscoveryParameters {
    /// Blank override and filter strings are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDistance`] when `distance_miles` is zero.
    pub fn new(
        distance_miles: u32,
        zip_code_override: Option<String>,
        office_type_filter: Option<String>,
    ) -> Result<Self, CoreError> {
        if distance_miles == 0 {
            return Err(CoreError::InvalidDistance);
        }
        Ok(Self {
            distance_miles,
            zip_code_override: non_blank(zip_code_override),
            office_type_filter: non_blank(office_type_filter),
        })
    }

    #[must_use]
    pub fn distance_miles(&self) -> u32 {
        self.distance_miles
    }

    #[must_use]
    pub fn zip_code_override(&self) -> Option<&str> {
        self.zip_code_override.as_deref()
    }

    #[must_use]
    pub fn office_type_filter(&self) -> Option<&str> {
        self.office_type_filter.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One completed search execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySession {
    pub id: Uuid,
    pub search_distance: u32,
    pub search_origin: SearchOrigin,
    pub office_type_filter: Option<String>,
    pub zip_code_override: Option<String>,
    pub results_count: usize,
    /// `false` when the results were served from the discovery cache.
    pub external_call_made: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_is_rejected() {
        assert_eq!(
            DiscoveryParameters::new(0, None, None),
            Err(CoreError::InvalidDistance)
        );
    }

    #[test]
    fn blank_override_and_filter_are_dropped() {
        let params =
            DiscoveryParameters::new(10, Some("  ".to_string()), Some(String::new())).unwrap();
        assert_eq!(params.distance_miles(), 10);
        assert!(params.zip_code_override().is_none());
        assert!(params.office_type_filter().is_none());
    }

    #[test]
    fn override_is_trimmed() {
        let params = DiscoveryParameters::new(5, Some(" 10001 ".to_string()), None).unwrap();
        assert_eq!(params.zip_code_override(), Some("10001"));
    }

    #[test]
    fn origin_source_serializes_with_tag() {
        let json = serde_json::to_value(OriginSource::ZipOverride("10001".to_string())).unwrap();
        assert_eq!(json["kind"], "zip_override");
        assert_eq!(json["zip"], "10001");
    }
}
