//! Entry point used by the server and CLI: runs searches through the
//! [`SessionTracker`] and handles imports into the network.

use std::sync::Arc;

use refnet_core::DiscoveryParameters;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiUsage, DiscoveryError, Notification};
use crate::ports::{
    ClinicProfileReader, DiscoveryCache, NetworkMember, NetworkReader, NetworkWriter,
    PlacesProvider, TierReader, UsageReader, ZipGeocoder,
};
use crate::presenter::{DiscoverySummary, PresentedSession};
use crate::snapshot::SnapshotStore;
use crate::tracker::{SessionTracker, TrackedSession};
use crate::workflow::{DiscoveryWorkflow, WorkflowSettings};

/// Everything the service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub clinics: Arc<dyn ClinicProfileReader>,
    pub geocoder: Arc<dyn ZipGeocoder>,
    pub cache: Arc<dyn DiscoveryCache>,
    pub places: Arc<dyn PlacesProvider>,
    pub network_reader: Arc<dyn NetworkReader>,
    pub network_writer: Arc<dyn NetworkWriter>,
    pub tiers: Arc<dyn TierReader>,
    pub usage: Arc<dyn UsageReader>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchResult {
    Presented(PresentedSession),
    Failed(Notification),
    /// A newer search for the same user finished first; this result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub imported: Vec<NetworkMember>,
    /// Requested ids that were unknown or already in the network.
    pub skipped: usize,
    pub summary: Option<DiscoverySummary>,
}

pub struct DiscoveryService {
    workflow: DiscoveryWorkflow,
    tracker: SessionTracker,
    network_writer: Arc<dyn NetworkWriter>,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: WorkflowSettings) -> Self {
        let Collaborators {
            clinics,
            geocoder,
            cache,
            places,
            network_reader,
            network_writer,
            tiers,
            usage,
            snapshots,
        } = collaborators;
        Self {
            workflow: DiscoveryWorkflow::new(
                clinics,
                geocoder,
                cache,
                places,
                network_reader,
                tiers,
                usage,
                settings,
            ),
            tracker: SessionTracker::new(snapshots),
            network_writer,
        }
    }

    /// Runs a search for `user_id`. Starting a search supersedes any search
    /// the user still has running.
    pub async fn search(&self, user_id: Uuid, params: DiscoveryParameters) -> SearchResult {
        let ticket = self.tracker.begin(user_id).await;
        let outcome = self
            .workflow
            .run(user_id, &params, &self.tracker.sink(ticket))
            .await;

        if !self.tracker.finish(ticket, &outcome).await {
            return SearchResult::Superseded;
        }
        match outcome {
            Ok(presented) => SearchResult::Presented(presented),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "discovery search failed");
                SearchResult::Failed(e.notification())
            }
        }
    }

    pub async fn current(&self, user_id: Uuid) -> TrackedSession {
        self.tracker.current(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) {
        self.tracker.clear(user_id).await;
    }

    /// Adds selected offices from the presented session to the network.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Storage`] when the network write fails. The
    /// session is left unchanged in that case.
    pub async fn import(
        &self,
        user_id: Uuid,
        office_ids: &[Uuid],
    ) -> Result<ImportOutcome, DiscoveryError> {
        let candidates = self.tracker.importable(user_id, office_ids).await;
        let skipped = office_ids.len().saturating_sub(candidates.len());
        if candidates.is_empty() {
            return Ok(ImportOutcome {
                imported: Vec::new(),
                skipped,
                summary: self.current(user_id).await.presented.map(|p| p.summary),
            });
        }

        let imported = self
            .network_writer
            .add_to_network(user_id, &candidates)
            .await?;
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        let updated = self.tracker.mark_imported(user_id, &ids).await;
        tracing::info!(%user_id, imported = imported.len(), updated, skipped, "offices imported into network");

        Ok(ImportOutcome {
            imported,
            skipped,
            summary: self.current(user_id).await.presented.map(|p| p.summary),
        })
    }

    /// External-call usage for the trailing 24 hours.
    pub async fn usage(&self, user_id: Uuid) -> Option<ApiUsage> {
        self.workflow.refresh_usage(user_id).await
    }
}
