//! Collaborator interfaces injected into the discovery workflow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refnet_core::{CandidateOffice, Coordinates, DiscoverySession, RawPlace, ReferralTier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlacesError, StoreError};
use crate::state::SearchPhase;

/// The authenticated user's clinic as stored in their profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicProfile {
    pub clinic_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// An office already tracked in the user's referral network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMember {
    pub office_id: Uuid,
    pub place_id: Option<String>,
    pub name: String,
}

/// Parameters sent to the places provider for one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacesQuery {
    pub clinic_id: Uuid,
    pub distance_miles: u32,
    pub origin: Coordinates,
    pub office_type_filter: Option<String>,
    pub zip_code_override: Option<String>,
}

#[async_trait]
pub trait ClinicProfileReader: Send + Sync {
    /// Returns `Ok(None)` when the user has no clinic on file.
    async fn clinic_profile(&self, user_id: Uuid) -> Result<Option<ClinicProfile>, StoreError>;
}

#[async_trait]
pub trait ZipGeocoder: Send + Sync {
    /// Returns `Ok(None)` when the ZIP code does not resolve to a location.
    async fn geocode_zip(&self, zip5: &str) -> Result<Option<Coordinates>, PlacesError>;
}

/// Previously fetched candidate rows, keyed by the radius they were fetched for.
#[async_trait]
pub trait DiscoveryCache: Send + Sync {
    /// Rows recorded for exactly `distance_miles`. Empty on a miss.
    async fn cached_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
    ) -> Result<Vec<CandidateOffice>, StoreError>;

    async fn store_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
        offices: &[CandidateOffice],
    ) -> Result<(), StoreError>;

    async fn record_session(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        session: &DiscoverySession,
    ) -> Result<(), StoreError>;
}

/// Metered external lookup. Must not be called when the cache has a hit.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn search(&self, query: &PlacesQuery) -> Result<Vec<RawPlace>, PlacesError>;
}

#[async_trait]
pub trait NetworkReader: Send + Sync {
    /// The complete set of offices the user currently tracks.
    async fn network_members(&self, user_id: Uuid) -> Result<Vec<NetworkMember>, StoreError>;
}

#[async_trait]
pub trait NetworkWriter: Send + Sync {
    /// Adds candidates to the user's network, returning the created members.
    async fn add_to_network(
        &self,
        user_id: Uuid,
        offices: &[CandidateOffice],
    ) -> Result<Vec<NetworkMember>, StoreError>;
}

#[async_trait]
pub trait TierReader: Send + Sync {
    async fn tier_for(&self, office_id: Uuid) -> Result<ReferralTier, StoreError>;
}

#[async_trait]
pub trait UsageReader: Send + Sync {
    async fn external_calls_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;
}

/// Receives intermediate phase changes while a search runs.
#[async_trait]
pub trait PhaseSink: Send + Sync {
    async fn enter(&self, phase: SearchPhase);
}

/// Sink that ignores phase changes. Useful for one-shot callers.
pub struct NoopPhaseSink;

#[async_trait]
impl PhaseSink for NoopPhaseSink {
    async fn enter(&self, _phase: SearchPhase) {}
}
