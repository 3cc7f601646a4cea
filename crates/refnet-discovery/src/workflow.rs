//! The discovery pipeline for a single search.

use std::sync::Arc;

use chrono::{Duration, Utc};
use refnet_core::office::office_type_label;
use refnet_core::{AppConfig, CandidateOffice, DiscoveryParameters, DiscoverySession};
use uuid::Uuid;

use crate::dedup::{dedupe_by_place_id, mark_network_members, NetworkIndex};
use crate::enrich::enrich_tiers;
use crate::error::{ApiUsage, DiscoveryError};
use crate::locator::resolve_origin;
use crate::ports::{
    ClinicProfileReader, DiscoveryCache, NetworkReader, PhaseSink, PlacesProvider, PlacesQuery,
    TierReader, UsageReader, ZipGeocoder,
};
use crate::presenter::{present, PresentedSession};
use crate::ranker::rank_offices;
use crate::retry::retry_with_backoff;
use crate::state::SearchPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Extra attempts after a generic provider failure.
    pub provider_max_retries: u32,
    pub provider_retry_backoff_ms: u64,
    pub daily_external_call_limit: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            provider_max_retries: 1,
            provider_retry_backoff_ms: 500,
            daily_external_call_limit: 25,
        }
    }
}

impl WorkflowSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider_max_retries: config.provider_max_retries,
            provider_retry_backoff_ms: config.provider_retry_backoff_ms,
            daily_external_call_limit: config.daily_external_call_limit,
        }
    }
}

/// Runs one search: locate → cache → (provider) → rank → dedupe → present.
#[derive(Clone)]
pub struct DiscoveryWorkflow {
    pub(crate) clinics: Arc<dyn ClinicProfileReader>,
    pub(crate) geocoder: Arc<dyn ZipGeocoder>,
    pub(crate) cache: Arc<dyn DiscoveryCache>,
    pub(crate) places: Arc<dyn PlacesProvider>,
    pub(crate) network: Arc<dyn NetworkReader>,
    pub(crate) tiers: Arc<dyn TierReader>,
    pub(crate) usage: Arc<dyn UsageReader>,
    pub(crate) settings: WorkflowSettings,
}

impl DiscoveryWorkflow {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        clinics: Arc<dyn ClinicProfileReader>,
        geocoder: Arc<dyn ZipGeocoder>,
        cache: Arc<dyn DiscoveryCache>,
        places: Arc<dyn PlacesProvider>,
        network: Arc<dyn NetworkReader>,
        tiers: Arc<dyn TierReader>,
        usage: Arc<dyn UsageReader>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            clinics,
            geocoder,
            cache,
            places,
            network,
            tiers,
            usage,
            settings,
        }
    }

    /// Executes a search for `user_id`, reporting intermediate phases to `sink`.
    ///
    /// The provider is only called on a cache miss. Terminal phases
    /// (`Presented` / `Failed`) are left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the origin cannot be resolved, the
    /// cache cannot be read, or the provider call fails.
    pub async fn run(
        &self,
        user_id: Uuid,
        params: &DiscoveryParameters,
        sink: &dyn PhaseSink,
    ) -> Result<PresentedSession, DiscoveryError> {
        let resolved =
            resolve_origin(user_id, params, self.clinics.as_ref(), self.geocoder.as_ref()).await?;
        let distance = params.distance_miles();

        let office_type = params.office_type_filter();

        let mut cached = self
            .cache
            .cached_offices(user_id, resolved.clinic_id, distance)
            .await?;
        if let Some(filter) = office_type {
            cached = matching_office_type(cached, filter);
        }

        let (mut offices, external_call_made) = if cached.is_empty() {
            sink.enter(SearchPhase::AwaitingExternalCall).await;
            tracing::info!(
                %user_id,
                distance,
                office_type,
                "discovery cache miss; calling places provider"
            );
            let fetched = self.fetch_from_provider(user_id, &resolved, params).await?;
            // The cache holds unfiltered batches only.
            if office_type.is_none() {
                if let Err(e) = self
                    .cache
                    .store_offices(user_id, resolved.clinic_id, distance, &fetched)
                    .await
                {
                    tracing::warn!(%user_id, error = %e, "failed to write discovery cache");
                }
            }
            (fetched, true)
        } else {
            sink.enter(SearchPhase::CacheHit).await;
            tracing::info!(%user_id, distance, rows = cached.len(), "discovery cache hit");
            (cached, false)
        };

        let members = match self.network.network_members(user_id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "network read failed; no offices flagged as existing");
                Vec::new()
            }
        };
        let index = NetworkIndex::new(&members);
        let matched = mark_network_members(&mut offices, &index);

        let mut ranked = rank_offices(&resolved.origin, offices);
        let failures = enrich_tiers(self.tiers.as_ref(), &index, &mut ranked).await;
        if failures > 0 {
            tracing::warn!(%user_id, failures, "some tier lookups fell back to the placeholder");
        }
        sink.enter(SearchPhase::Ranked).await;

        let session = DiscoverySession {
            id: Uuid::new_v4(),
            search_distance: distance,
            search_origin: resolved.origin,
            office_type_filter: params.office_type_filter().map(str::to_string),
            zip_code_override: params.zip_code_override().map(str::to_string),
            results_count: ranked.len(),
            external_call_made,
            created_at: Utc::now(),
        };
        if let Err(e) = self
            .cache
            .record_session(user_id, resolved.clinic_id, &session)
            .await
        {
            tracing::warn!(%user_id, error = %e, "failed to record discovery session");
        }

        tracing::info!(
            %user_id,
            session_id = %session.id,
            results = session.results_count,
            in_network = matched,
            external_call_made,
            "discovery search ranked"
        );
        Ok(present(session, ranked))
    }

    async fn fetch_from_provider(
        &self,
        user_id: Uuid,
        resolved: &crate::locator::ResolvedOrigin,
        params: &DiscoveryParameters,
    ) -> Result<Vec<CandidateOffice>, DiscoveryError> {
        let query = PlacesQuery {
            clinic_id: resolved.clinic_id,
            distance_miles: params.distance_miles(),
            origin: resolved.origin.coordinates,
            office_type_filter: params.office_type_filter().map(str::to_string),
            zip_code_override: params.zip_code_override().map(str::to_string),
        };

        let result = retry_with_backoff(
            self.settings.provider_max_retries,
            self.settings.provider_retry_backoff_ms,
            || self.places.search(&query),
        )
        .await;

        match result {
            Ok(raw) => Ok(dedupe_by_place_id(
                raw.into_iter().map(CandidateOffice::from_raw).collect(),
            )),
            Err(err) => {
                let mut err = DiscoveryError::from(err);
                if let DiscoveryError::RateLimited { usage, .. } = &mut err {
                    *usage = self.refresh_usage(user_id).await;
                }
                tracing::error!(%user_id, error = %err, "places provider lookup failed");
                Err(err)
            }
        }
    }

    /// External calls over the last 24 hours, or `None` if the read fails.
    pub async fn refresh_usage(&self, user_id: Uuid) -> Option<ApiUsage> {
        let since = Utc::now() - Duration::hours(24);
        match self.usage.external_calls_since(user_id, since).await {
            Ok(calls) => Some(ApiUsage {
                calls_last_24h: calls,
                daily_limit: self.settings.daily_external_call_limit,
            }),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "failed to refresh usage counters");
                None
            }
        }
    }
}

/// Cached rows whose label matches the label the provider type `filter`
/// maps to.
fn matching_office_type(offices: Vec<CandidateOffice>, filter: &str) -> Vec<CandidateOffice> {
    let wanted = office_type_label(Some(filter));
    offices
        .into_iter()
        .filter(|o| o.office_type_label.eq_ignore_ascii_case(&wanted))
        .collect()
}
