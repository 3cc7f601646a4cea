//! Session presentation: summary counts, display lists and the
//! radius-expansion recommendation.

use refnet_core::DiscoverySession;
use serde::{Deserialize, Serialize};

use crate::ranker::{sort_offices, RankedOffice, SortKey};

/// Below this many new opportunities a wider search is suggested.
pub const RECOMMEND_BELOW_NEW_COUNT: usize = 10;
/// Radius at or above which no expansion is suggested.
pub const RECOMMEND_RADIUS_CAP_MILES: u32 = 25;
/// Miles added by a suggested expansion.
pub const RECOMMEND_INCREMENT_MILES: u32 = 10;
/// Ratings at or above this count as high rated.
pub const HIGH_RATING_THRESHOLD: f64 = 4.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscoverySummary {
    pub total: usize,
    pub new_opportunities: usize,
    /// Offices already in the network or imported during this session.
    pub already_in_network: usize,
    pub high_rated: usize,
    pub with_website: usize,
}

impl DiscoverySummary {
    #[must_use]
    pub fn from_offices(offices: &[RankedOffice]) -> Self {
        let new_opportunities = offices
            .iter()
            .filter(|o| o.office.is_new_opportunity())
            .count();
        Self {
            total: offices.len(),
            new_opportunities,
            already_in_network: offices.len() - new_opportunities,
            high_rated: offices
                .iter()
                .filter(|o| o.office.rating.is_some_and(|r| r >= HIGH_RATING_THRESHOLD))
                .count(),
            with_website: offices
                .iter()
                .filter(|o| o.office.website.as_deref().is_some_and(|w| !w.trim().is_empty()))
                .count(),
        }
    }
}

/// Advisory suggestion to widen the search. Never triggers a search itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub suggested_distance: u32,
    pub message: String,
}

#[must_use]
pub fn recommendation(new_opportunities: usize, radius_miles: u32) -> Option<Recommendation> {
    if new_opportunities >= RECOMMEND_BELOW_NEW_COUNT || radius_miles >= RECOMMEND_RADIUS_CAP_MILES
    {
        return None;
    }
    let suggested_distance = radius_miles.saturating_add(RECOMMEND_INCREMENT_MILES);
    Some(Recommendation {
        suggested_distance,
        message: format!(
            "Only {new_opportunities} new offices found within {radius_miles} miles. \
             Try expanding your search to {suggested_distance} miles."
        ),
    })
}

/// A finished search ready for display and import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentedSession {
    pub session: DiscoverySession,
    pub offices: Vec<RankedOffice>,
    pub summary: DiscoverySummary,
    pub recommendation: Option<Recommendation>,
}

/// Packages a ranked, deduplicated list with its session summary.
#[must_use]
pub fn present(session: DiscoverySession, offices: Vec<RankedOffice>) -> PresentedSession {
    let mut presented = PresentedSession {
        session,
        offices,
        summary: DiscoverySummary::default(),
        recommendation: None,
    };
    presented.refresh();
    presented
}

impl PresentedSession {
    /// Recomputes summary and recommendation after offices change.
    pub fn refresh(&mut self) {
        self.summary = DiscoverySummary::from_offices(&self.offices);
        self.recommendation = recommendation(
            self.summary.new_opportunities,
            self.session.search_distance,
        );
    }

    /// New opportunities only.
    pub fn new_opportunities(&self) -> impl Iterator<Item = &RankedOffice> {
        self.offices.iter().filter(|o| o.office.is_new_opportunity())
    }

    /// Offices already in the network or imported.
    pub fn already_added(&self) -> impl Iterator<Item = &RankedOffice> {
        self.offices.iter().filter(|o| !o.office.is_new_opportunity())
    }

    /// The display list: new opportunities, plus already-added offices when
    /// `show_already_added` is set, sorted by `sort`.
    #[must_use]
    pub fn visible(&self, show_already_added: bool, sort: SortKey) -> Vec<RankedOffice> {
        let mut list: Vec<RankedOffice> = self
            .offices
            .iter()
            .filter(|o| show_already_added || o.office.is_new_opportunity())
            .cloned()
            .collect();
        sort_offices(&mut list, sort);
        list
    }
}
