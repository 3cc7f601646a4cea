//! Distance annotation and display sorting.

use std::cmp::Ordering;

use refnet_core::{CandidateOffice, ReferralTier, SearchOrigin};
use serde::{Deserialize, Serialize};

use crate::geo::haversine_miles;

/// A candidate plus the fields derived for the current search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOffice {
    #[serde(flatten)]
    pub office: CandidateOffice,
    /// Miles from the search origin. `None` when the office has no coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    /// Referral tier, only for offices already in the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ReferralTier>,
}

/// Attaches a distance to every candidate that has coordinates.
///
/// Input order is preserved; no sorting happens here.
#[must_use]
pub fn rank_offices(origin: &SearchOrigin, offices: Vec<CandidateOffice>) -> Vec<RankedOffice> {
    offices
        .into_iter()
        .map(|office| RankedOffice {
            distance_miles: office
                .coordinates
                .map(|c| haversine_miles(origin.coordinates, c)),
            office,
            tier: None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Distance,
    Rating,
    Name,
    OfficeType,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(SortKey::Distance),
            "rating" => Ok(SortKey::Rating),
            "name" => Ok(SortKey::Name),
            "office_type" | "type" => Ok(SortKey::OfficeType),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// Missing values sort after present ones regardless of direction.
fn missing_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if descending => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Stable sort: ties keep the order the upstream source returned.
///
/// `Distance`, `Name` and `OfficeType` sort ascending; `Rating` sorts
/// descending. Offices without a distance or rating go last.
pub fn sort_offices(offices: &mut [RankedOffice], key: SortKey) {
    match key {
        SortKey::Distance => {
            offices.sort_by(|a, b| missing_last(a.distance_miles, b.distance_miles, false));
        }
        SortKey::Rating => {
            offices.sort_by(|a, b| missing_last(a.office.rating, b.office.rating, true));
        }
        SortKey::Name => offices.sort_by(|a, b| case_insensitive(&a.office.name, &b.office.name)),
        SortKey::OfficeType => offices.sort_by(|a, b| {
            case_insensitive(&a.office.office_type_label, &b.office.office_type_label)
        }),
    }
}
