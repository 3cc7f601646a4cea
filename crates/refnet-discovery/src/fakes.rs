//! In-memory collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refnet_core::{
    CandidateOffice, Coordinates, DiscoverySession, OriginSource, RawPlace, ReferralTier,
    SearchOrigin,
};
use uuid::Uuid;

use crate::error::{PlacesError, StoreError};
use crate::ports::{
    ClinicProfile, ClinicProfileReader, DiscoveryCache, NetworkMember, NetworkReader,
    NetworkWriter, PhaseSink, PlacesProvider, PlacesQuery, TierReader, UsageReader, ZipGeocoder,
};
use crate::state::SearchPhase;
use crate::workflow::{DiscoveryWorkflow, WorkflowSettings};

pub(crate) fn candidate(place_id: &str, name: &str) -> CandidateOffice {
    let mut office = CandidateOffice::from_raw(raw_place(place_id, 40.72, -74.0));
    office.name = name.to_string();
    office
}

pub(crate) fn raw_place(place_id: &str, lat: f64, lng: f64) -> RawPlace {
    RawPlace {
        place_id: place_id.to_string(),
        name: format!("Office {place_id}"),
        address: Some("1 Main St".to_string()),
        phone: None,
        website: None,
        rating: Some(4.0),
        coordinates: Some(Coordinates::new(lat, lng)),
        raw_type_label: Some("dentist".to_string()),
    }
}

pub(crate) fn nyc_origin() -> SearchOrigin {
    SearchOrigin {
        coordinates: Coordinates::new(40.7128, -74.0060),
        source: OriginSource::Clinic,
    }
}

pub(crate) fn clinic(coords: Option<(f64, f64)>) -> ClinicProfile {
    ClinicProfile {
        clinic_id: Uuid::new_v4(),
        name: "Downtown Endodontics".to_string(),
        address: Some("100 Broadway, New York, NY".to_string()),
        latitude: coords.map(|c| c.0),
        longitude: coords.map(|c| c.1),
    }
}

pub(crate) fn member(place_id: Option<&str>, name: &str) -> NetworkMember {
    NetworkMember {
        office_id: Uuid::new_v4(),
        place_id: place_id.map(str::to_string),
        name: name.to_string(),
    }
}

pub(crate) fn session_for(distance: u32, results_count: usize) -> DiscoverySession {
    DiscoverySession {
        id: Uuid::new_v4(),
        search_distance: distance,
        search_origin: nyc_origin(),
        office_type_filter: None,
        zip_code_override: None,
        results_count,
        external_call_made: true,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub(crate) struct FakeClinics {
    profiles: Mutex<HashMap<Uuid, ClinicProfile>>,
}

impl FakeClinics {
    pub(crate) fn with(user: Uuid, profile: ClinicProfile) -> Self {
        let fake = Self::default();
        fake.profiles.lock().unwrap().insert(user, profile);
        fake
    }

    pub(crate) fn move_clinic(&self, user: Uuid, to: Coordinates) {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&user).expect("clinic for user");
        profile.latitude = Some(to.lat);
        profile.longitude = Some(to.lng);
    }
}

#[async_trait]
impl ClinicProfileReader for FakeClinics {
    async fn clinic_profile(&self, user_id: Uuid) -> Result<Option<ClinicProfile>, StoreError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeGeocoder {
    zips: Mutex<HashMap<String, Coordinates>>,
    calls: AtomicU32,
}

impl FakeGeocoder {
    pub(crate) fn with(zip: &str, coords: Coordinates) -> Self {
        let fake = Self::default();
        fake.insert(zip, coords);
        fake
    }

    pub(crate) fn insert(&self, zip: &str, coords: Coordinates) {
        self.zips.lock().unwrap().insert(zip.to_string(), coords);
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZipGeocoder for FakeGeocoder {
    async fn geocode_zip(&self, zip5: &str) -> Result<Option<Coordinates>, PlacesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.zips.lock().unwrap().get(zip5).copied())
    }
}

type CacheKey = (Uuid, Uuid, u32);

#[derive(Default)]
pub(crate) struct FakeCache {
    rows: Mutex<HashMap<CacheKey, Vec<CandidateOffice>>>,
    sessions: Mutex<Vec<Uuid>>,
    reads: AtomicUsize,
}

impl FakeCache {
    pub(crate) fn stored_for(&self, distance: u32) -> Vec<CandidateOffice> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, _, d), _)| *d == distance)
            .flat_map(|(_, rows)| rows.clone())
            .collect()
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn sessions(&self) -> Vec<Uuid> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryCache for FakeCache {
    async fn cached_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
    ) -> Result<Vec<CandidateOffice>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(user_id, clinic_id, distance_miles))
            .cloned()
            .unwrap_or_default())
    }

    async fn store_offices(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        distance_miles: u32,
        offices: &[CandidateOffice],
    ) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap()
            .insert((user_id, clinic_id, distance_miles), offices.to_vec());
        Ok(())
    }

    async fn record_session(
        &self,
        _user_id: Uuid,
        _clinic_id: Uuid,
        session: &DiscoverySession,
    ) -> Result<(), StoreError> {
        self.sessions.lock().unwrap().push(session.id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePlaces {
    result: Mutex<Option<Result<Vec<RawPlace>, PlacesError>>>,
    last_query: Mutex<Option<PlacesQuery>>,
    calls: AtomicU32,
}

impl FakePlaces {
    pub(crate) fn respond(&self, places: Vec<RawPlace>) {
        *self.result.lock().unwrap() = Some(Ok(places));
    }

    pub(crate) fn fail_with(&self, err: PlacesError) {
        *self.result.lock().unwrap() = Some(Err(err));
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_query(&self) -> Option<PlacesQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlacesProvider for FakePlaces {
    async fn search(&self, query: &PlacesQuery) -> Result<Vec<RawPlace>, PlacesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        self.result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
pub(crate) struct FakeNetwork {
    members: Mutex<Vec<NetworkMember>>,
    failing: Mutex<bool>,
}

impl FakeNetwork {
    pub(crate) fn add(&self, place_id: Option<&str>, name: &str) -> NetworkMember {
        let m = member(place_id, name);
        self.members.lock().unwrap().push(m.clone());
        m
    }

    pub(crate) fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub(crate) fn members(&self) -> Vec<NetworkMember> {
        self.members.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkReader for FakeNetwork {
    async fn network_members(&self, _user_id: Uuid) -> Result<Vec<NetworkMember>, StoreError> {
        if *self.failing.lock().unwrap() {
            return Err(StoreError::Backend("network unavailable".to_string()));
        }
        Ok(self.members())
    }
}

#[async_trait]
impl NetworkWriter for FakeNetwork {
    async fn add_to_network(
        &self,
        _user_id: Uuid,
        offices: &[CandidateOffice],
    ) -> Result<Vec<NetworkMember>, StoreError> {
        if *self.failing.lock().unwrap() {
            return Err(StoreError::Backend("network unavailable".to_string()));
        }
        Ok(offices
            .iter()
            .map(|o| self.add(Some(&o.place_id), &o.name))
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeTiers {
    tiers: HashMap<Uuid, ReferralTier>,
    failing: HashSet<Uuid>,
    calls: AtomicU32,
}

impl FakeTiers {
    pub(crate) fn with(mut self, office_id: Uuid, tier: ReferralTier) -> Self {
        self.tiers.insert(office_id, tier);
        self
    }

    pub(crate) fn failing(mut self, office_id: Uuid) -> Self {
        self.failing.insert(office_id);
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TierReader for FakeTiers {
    async fn tier_for(&self, office_id: Uuid) -> Result<ReferralTier, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&office_id) {
            return Err(StoreError::Backend("tier query failed".to_string()));
        }
        Ok(self
            .tiers
            .get(&office_id)
            .copied()
            .unwrap_or(ReferralTier::Sporadic))
    }
}

#[derive(Default)]
pub(crate) struct FakeUsage {
    calls: AtomicU32,
}

impl FakeUsage {
    pub(crate) fn set(&self, calls: u32) {
        self.calls.store(calls, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsageReader for FakeUsage {
    async fn external_calls_since(
        &self,
        _user_id: Uuid,
        _since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        Ok(self.calls.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    phases: Mutex<Vec<SearchPhase>>,
}

impl RecordingSink {
    pub(crate) fn phases(&self) -> Vec<SearchPhase> {
        self.phases.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhaseSink for RecordingSink {
    async fn enter(&self, phase: SearchPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}

/// A user with a clinic in lower Manhattan and empty collaborators.
pub(crate) struct Harness {
    pub(crate) user: Uuid,
    pub(crate) clinics: Arc<FakeClinics>,
    pub(crate) geocoder: Arc<FakeGeocoder>,
    pub(crate) cache: Arc<FakeCache>,
    pub(crate) places: Arc<FakePlaces>,
    pub(crate) network: Arc<FakeNetwork>,
    pub(crate) tiers: Arc<FakeTiers>,
    pub(crate) usage: Arc<FakeUsage>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let user = Uuid::new_v4();
        Self::build(user, FakeClinics::with(user, clinic(Some((40.7128, -74.0060)))))
    }

    pub(crate) fn without_clinic() -> Self {
        Self::build(Uuid::new_v4(), FakeClinics::default())
    }

    fn build(user: Uuid, clinics: FakeClinics) -> Self {
        Self {
            user,
            clinics: Arc::new(clinics),
            geocoder: Arc::default(),
            cache: Arc::default(),
            places: Arc::default(),
            network: Arc::default(),
            tiers: Arc::default(),
            usage: Arc::default(),
        }
    }

    pub(crate) fn workflow(&self) -> DiscoveryWorkflow {
        DiscoveryWorkflow::new(
            self.clinics.clone(),
            self.geocoder.clone(),
            self.cache.clone(),
            self.places.clone(),
            self.network.clone(),
            self.tiers.clone(),
            self.usage.clone(),
            WorkflowSettings {
                provider_max_retries: 1,
                provider_retry_backoff_ms: 0,
                daily_external_call_limit: 25,
            },
        )
    }
}
