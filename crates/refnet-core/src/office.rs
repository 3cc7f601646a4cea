//! Office records surfaced by discovery.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds coordinates only when both halves are present and finite.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Self { lat, lng })
            }
            _ => None,
        }
    }
}

/// An office record as returned by the places provider, before it becomes
/// a [`CandidateOffice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub coordinates: Option<Coordinates>,
    pub raw_type_label: Option<String>,
}

/// One externally discovered business location.
///
/// Distance is not stored here: it depends on the search origin and is
/// attached by the ranker at presentation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOffice {
    pub id: Uuid,
    /// Provider-assigned unique identifier.
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Provider rating on a 0–5 scale.
    pub rating: Option<f64>,
    pub coordinates: Option<Coordinates>,
    pub office_type_label: String,
    pub already_in_network: bool,
    pub imported: bool,
}

impl CandidateOffice {
    /// Converts a provider record into a fresh, not-yet-imported candidate.
    ///
    /// Ratings outside 0–5 are discarded rather than clamped.
    #[must_use]
    pub fn from_raw(raw: RawPlace) -> Self {
        let rating = raw.rating.filter(|r| (0.0..=5.0).contains(r));
        Self {
            id: Uuid::new_v4(),
            office_type_label: office_type_label(raw.raw_type_label.as_deref()),
            place_id: raw.place_id,
            name: raw.name,
            address: raw.address,
            phone: raw.phone,
            website: raw.website.filter(|w| !w.trim().is_empty()),
            rating,
            coordinates: raw.coordinates,
            already_in_network: false,
            imported: false,
        }
    }

    /// `true` when the office is not yet part of the user's network.
    #[must_use]
    pub fn is_new_opportunity(&self) -> bool {
        !self.already_in_network && !self.imported
    }
}

/// Maps a provider type tag (e.g. `"pediatric_dentist"`) to a display label.
#[must_use]
pub fn office_type_label(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "Dental Office".to_string();
    };
    match raw.to_ascii_lowercase().as_str() {
        "dentist" | "dental_clinic" | "general_dentist" => "General Dentistry".to_string(),
        "orthodontist" => "Orthodontics".to_string(),
        "endodontist" => "Endodontics".to_string(),
        "periodontist" => "Periodontics".to_string(),
        "oral_surgeon" | "oral_and_maxillofacial_surgeon" => "Oral Surgery".to_string(),
        "pediatric_dentist" => "Pediatric Dentistry".to_string(),
        "prosthodontist" => "Prosthodontics".to_string(),
        other => other
            .split(['_', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect::<String>()
                })
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Activity classification of an office already in the referral network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralTier {
    Strong,
    Moderate,
    Sporadic,
    Cold,
}

impl std::fmt::Display for ReferralTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralTier::Strong => write!(f, "strong"),
            ReferralTier::Moderate => write!(f, "moderate"),
            ReferralTier::Sporadic => write!(f, "sporadic"),
            ReferralTier::Cold => write!(f, "cold"),
        }
    }
}

impl std::str::FromStr for ReferralTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(ReferralTier::Strong),
            "moderate" => Ok(ReferralTier::Moderate),
            "sporadic" => Ok(ReferralTier::Sporadic),
            "cold" => Ok(ReferralTier::Cold),
            other => Err(CoreError::InvalidTier(other.to_string())),
        }
    }
}
