//! Postgres-backed implementations of the discovery collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refnet_core::{CandidateOffice, Coordinates, DiscoverySession, OriginSource, ReferralTier};
use refnet_discovery::{
    ClinicProfile, ClinicProfileReader, DiscoveryCache, NetworkMember, NetworkReader,
    NetworkWriter, StoreError, TierReader, UsageReader,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinics::{get_clinic_for_user, ClinicRow};
use crate::discovery::{
    count_external_calls_since, insert_discovery_session, list_cached_offices,
    mark_discovered_imported, upsert_discovered_offices, DiscoveredOfficeRow,
    DiscoverySessionRow, NewDiscoveredOffice,
};
use crate::network::{insert_network_offices, list_network_offices, NetworkOfficeRow, NewNetworkOffice};
use crate::tiers::get_office_tier;
use crate::{distance_param, DbError};

const DISCOVERY_SOURCE: &str = "discovery";

/// One pool, every discovery collaborator.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::from(DbError::from(err))
}

impl From<ClinicRow> for ClinicProfile {
    fn from(row: ClinicRow) -> Self {
        ClinicProfile {
            latitude: row.latitude_f64(),
            longitude: row.longitude_f64(),
            clinic_id: row.id,
            name: row.name,
            address: row.address,
        }
    }
}

impl From<DiscoveredOfficeRow> for CandidateOffice {
    fn from(row: DiscoveredOfficeRow) -> Self {
        let (lat, lng) = row.coordinates_f64();
        CandidateOffice {
            rating: row.rating_f64(),
            coordinates: Coordinates::from_parts(lat, lng),
            id: row.id,
            place_id: row.place_id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            website: row.website,
            office_type_label: row.office_type_label,
            already_in_network: false,
            imported: row.imported,
        }
    }
}

impl From<NetworkOfficeRow> for NetworkMember {
    fn from(row: NetworkOfficeRow) -> Self {
        NetworkMember {
            office_id: row.id,
            place_id: row.place_id,
            name: row.name,
        }
    }
}

fn to_new_discovered(office: &CandidateOffice) -> NewDiscoveredOffice {
    NewDiscoveredOffice {
        place_id: office.place_id.clone(),
        name: office.name.clone(),
        address: office.address.clone(),
        phone: office.phone.clone(),
        website: office.website.clone(),
        rating: office.rating,
        latitude: office.coordinates.map(|c| c.lat),
        longitude: office.coordinates.map(|c| c.lng),
        office_type_label: office.office_type_label.clone(),
    }
}

fn to_new_network(office: &CandidateOffice) -> NewNetworkOffice {
    NewNetworkOffice {
        place_id: Some(office.place_id.trim().to_string()).filter(|p| !p.is_empty()),
        name: office.name.clone(),
        address: office.address.clone(),
        phone: office.phone.clone(),
        website: office.website.clone(),
        office_type: Some(office.office_type_label.clone()),
        latitude: office.coordinates.map(|c| c.lat),
        longitude: office.coordinates.map(|c| c.lng),
    }
}

fn session_row(
    user_id: Uuid,
    clinic_id: Uuid,
    session: &DiscoverySession,
) -> Result<DiscoverySessionRow, DbError> {
    let origin_source = match session.search_origin.source {
        OriginSource::Clinic => "clinic",
        OriginSource::ZipOverride(_) => "zip_override",
    };
    let results_count = i32::try_from(session.results_count).map_err(|_| DbError::OutOfRange {
        field: "results_count",
        value: session.results_count.to_string(),
    })?;
    Ok(DiscoverySessionRow {
        id: session.id,
        user_id,
        clinic_id,
        search_distance: distance_param(session.search_distance)?,
        search_lat: session.search_origin.coordinates.lat,
        search_lng: session.search_origin.coordinates.lng,
        origin_source: origin_source.to_string(),
        zip_code_override: session.zip_code_override.clone(),
        office_type_filter: session.office_type_filter.clone(),
        results_count,
        api_call_made: session.external_call_made,
        created_at: session.created_at,
    })
}

#[async_trait]
impl ClinicProfileReader for PgStore {
    async fn clinic_profile(&self, user_id: Uuid) -> Result<Option<ClinicProfile>, StoreError> {
        let row = get_clinic_for_user(&self.pool, user_id)
            .await
            .map_err(backend)?;
        Ok(row.map(ClinicProfile::from))
    }
}

#[async_trait]
impl DiscoveryCache for PgStore {
    async fn cached_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
    ) -> Result<Vec<CandidateOffice>, StoreError> {
        let distance = distance_param(distance_miles)?;
        let rows = list_cached_offices(&self.pool, user_id, clinic_id, distance)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(CandidateOffice::from).collect())
    }

    async fn store_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
        offices: &[CandidateOffice],
    ) -> Result<(), StoreError> {
        let distance = distance_param(distance_miles)?;
        let rows: Vec<NewDiscoveredOffice> = offices.iter().map(to_new_discovered).collect();
        let written = upsert_discovered_offices(&self.pool, user_id, clinic_id, distance, &rows)
            .await
            .map_err(backend)?;
        tracing::debug!(%user_id, %clinic_id, distance, written, "discovery cache updated");
        Ok(())
    }

    async fn record_session(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        session: &DiscoverySession,
    ) -> Result<(), StoreError> {
        let row = session_row(user_id, clinic_id, session)?;
        insert_discovery_session(&self.pool, &row)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl NetworkReader for PgStore {
    async fn network_members(&self, user_id: Uuid) -> Result<Vec<NetworkMember>, StoreError> {
        let rows = list_network_offices(&self.pool, user_id)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(NetworkMember::from).collect())
    }
}

#[async_trait]
impl NetworkWriter for PgStore {
    async fn add_to_network(
        &self,
        user_id: Uuid,
        offices: &[CandidateOffice],
    ) -> Result<Vec<NetworkMember>, StoreError> {
        let rows: Vec<NewNetworkOffice> = offices.iter().map(to_new_network).collect();
        let inserted = insert_network_offices(&self.pool, user_id, DISCOVERY_SOURCE, &rows)
            .await
            .map_err(backend)?;

        let place_ids: Vec<String> = offices.iter().map(|o| o.place_id.clone()).collect();
        if let Err(e) = mark_discovered_imported(&self.pool, user_id, &place_ids).await {
            tracing::warn!(%user_id, error = %e, "failed to flag cached rows as imported");
        }
        Ok(inserted.into_iter().map(NetworkMember::from).collect())
    }
}

#[async_trait]
impl TierReader for PgStore {
    async fn tier_for(&self, office_id: Uuid) -> Result<ReferralTier, StoreError> {
        Ok(get_office_tier(&self.pool, office_id).await?)
    }
}

#[async_trait]
impl UsageReader for PgStore {
    async fn external_calls_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let count = count_external_calls_since(&self.pool, user_id, since)
            .await
            .map_err(backend)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
