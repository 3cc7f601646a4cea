//! Per-user search state with last-search-wins semantics.
//!
//! Every [`SessionTracker::begin`] hands out a [`SearchTicket`] carrying a
//! generation number. Phase updates and results from a ticket whose
//! generation is no longer current are dropped, so a slow search can never
//! overwrite the results of a newer one.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use refnet_core::CandidateOffice;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::DiscoveryError;
use crate::ports::PhaseSink;
use crate::presenter::{present, PresentedSession};
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::state::SearchPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    pub user_id: Uuid,
    generation: u64,
}

/// What a user currently sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedSession {
    pub phase: SearchPhase,
    pub presented: Option<PresentedSession>,
}

#[derive(Debug, Default)]
struct UserState {
    generation: u64,
    snapshot: SessionSnapshot,
    restored: bool,
    /// Set by `clear` once the slot has left the map.
    evicted: bool,
}

type UserSlot = Arc<Mutex<UserState>>;

/// Tracks one slot per user. The map lock is only held to look a slot up;
/// snapshot I/O happens under the user's own lock.
pub struct SessionTracker {
    store: Arc<dyn SnapshotStore>,
    users: Mutex<HashMap<Uuid, UserSlot>>,
    generations: AtomicU64,
}

impl SessionTracker {
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            users: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Generations are unique across slots, so a ticket issued before a
    /// `clear` can never match the slot created after it.
    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Locks the user's slot, creating it and loading the persisted snapshot
    /// on first use.
    async fn lock_user(&self, user_id: Uuid) -> OwnedMutexGuard<UserState> {
        loop {
            let slot = {
                let mut users = self.users.lock().await;
                Arc::clone(users.entry(user_id).or_default())
            };
            let mut state = slot.lock_owned().await;
            if state.evicted {
                continue;
            }
            if !state.restored {
                state.snapshot = self.restore(user_id).await;
                state.restored = true;
            }
            return state;
        }
    }

    /// Locks the user's slot only if one is tracked.
    async fn lock_existing(&self, user_id: Uuid) -> Option<OwnedMutexGuard<UserState>> {
        loop {
            let slot = {
                let users = self.users.lock().await;
                users.get(&user_id).cloned()?
            };
            let state = slot.lock_owned().await;
            if state.evicted {
                continue;
            }
            return Some(state);
        }
    }

    /// A search cannot survive a restart, so an in-flight phase comes back
    /// as `Idle`.
    async fn restore(&self, user_id: Uuid) -> SessionSnapshot {
        match self.store.load(user_id).await {
            Ok(Some(snapshot)) if snapshot.phase.is_loading() => {
                tracing::debug!(%user_id, phase = ?snapshot.phase, "dropping interrupted search on restore");
                SessionSnapshot::default()
            }
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => SessionSnapshot::default(),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "failed to restore discovery snapshot");
                SessionSnapshot::default()
            }
        }
    }

    async fn persist(&self, user_id: Uuid, snapshot: &SessionSnapshot) {
        if let Err(e) = self.store.save(user_id, snapshot).await {
            tracing::warn!(%user_id, error = %e, "failed to save discovery snapshot");
        }
    }

    /// Starts a new search, superseding any search still running for the user.
    pub async fn begin(&self, user_id: Uuid) -> SearchTicket {
        let mut state = self.lock_user(user_id).await;
        if state.snapshot.phase.is_loading() {
            tracing::info!(%user_id, superseded = state.generation, "superseding in-flight search");
        }
        state.generation = self.next_generation();
        state.snapshot = SessionSnapshot {
            phase: SearchPhase::Searching,
            session: None,
            offices: Vec::new(),
        };
        self.persist(user_id, &state.snapshot).await;
        SearchTicket {
            user_id,
            generation: state.generation,
        }
    }

    /// Records an intermediate phase. Returns `false` if the ticket is stale
    /// or the transition is not allowed.
    pub async fn advance(&self, ticket: SearchTicket, phase: SearchPhase) -> bool {
        let Some(mut state) = self.lock_existing(ticket.user_id).await else {
            return false;
        };
        if state.generation != ticket.generation {
            return false;
        }
        match state.snapshot.phase.transition(phase) {
            Ok(next) => {
                state.snapshot.phase = next;
                self.persist(ticket.user_id, &state.snapshot).await;
                true
            }
            Err(e) => {
                tracing::warn!(user_id = %ticket.user_id, error = %e, "ignoring phase change");
                false
            }
        }
    }

    /// Applies a finished search. Results for a stale ticket are discarded
    /// and `false` is returned.
    pub async fn finish(
        &self,
        ticket: SearchTicket,
        outcome: &Result<PresentedSession, DiscoveryError>,
    ) -> bool {
        let Some(mut state) = self.lock_existing(ticket.user_id).await else {
            tracing::debug!(user_id = %ticket.user_id, "discarding result for cleared session");
            return false;
        };
        if state.generation != ticket.generation {
            tracing::debug!(
                user_id = %ticket.user_id,
                stale = ticket.generation,
                current = state.generation,
                "discarding superseded search result"
            );
            return false;
        }
        state.snapshot = match outcome {
            Ok(presented) => SessionSnapshot {
                phase: SearchPhase::Presented,
                session: Some(presented.session.clone()),
                offices: presented.offices.clone(),
            },
            Err(_) => SessionSnapshot {
                phase: SearchPhase::Failed,
                session: None,
                offices: Vec::new(),
            },
        };
        self.persist(ticket.user_id, &state.snapshot).await;
        true
    }

    /// The user's current phase and, once presented, their results.
    pub async fn current(&self, user_id: Uuid) -> TrackedSession {
        let snapshot = self.lock_user(user_id).await.snapshot.clone();
        TrackedSession {
            phase: snapshot.phase,
            presented: snapshot
                .session
                .filter(|_| snapshot.phase == SearchPhase::Presented)
                .map(|session| present(session, snapshot.offices)),
        }
    }

    /// Drops the user's results and in-memory slot, invalidating any
    /// running search.
    pub async fn clear(&self, user_id: Uuid) {
        let held = self.lock_existing(user_id).await;
        if let Err(e) = self.store.clear(user_id).await {
            tracing::warn!(%user_id, error = %e, "failed to clear discovery snapshot");
        }
        if let Some(mut state) = held {
            state.evicted = true;
            self.users.lock().await.remove(&user_id);
        }
    }

    /// New-opportunity candidates from the presented session whose ids are
    /// in `office_ids`. Unknown and already-added ids are skipped.
    pub async fn importable(&self, user_id: Uuid, office_ids: &[Uuid]) -> Vec<CandidateOffice> {
        let wanted: HashSet<&Uuid> = office_ids.iter().collect();
        let state = self.lock_user(user_id).await;
        if state.snapshot.phase != SearchPhase::Presented {
            return Vec::new();
        }
        state
            .snapshot
            .offices
            .iter()
            .filter(|o| wanted.contains(&o.office.id) && o.office.is_new_opportunity())
            .map(|o| o.office.clone())
            .collect()
    }

    /// Flags offices as imported. Returns how many were updated.
    pub async fn mark_imported(&self, user_id: Uuid, office_ids: &[Uuid]) -> usize {
        let wanted: HashSet<&Uuid> = office_ids.iter().collect();
        let mut state = self.lock_user(user_id).await;
        let mut updated = 0;
        for ranked in &mut state.snapshot.offices {
            if wanted.contains(&ranked.office.id) && !ranked.office.imported {
                ranked.office.imported = true;
                updated += 1;
            }
        }
        if updated > 0 {
            self.persist(user_id, &state.snapshot).await;
        }
        updated
    }

    #[cfg(test)]
    async fn tracked_users(&self) -> usize {
        self.users.lock().await.len()
    }

    /// A [`PhaseSink`] that forwards phase changes for `ticket`.
    #[must_use]
    pub fn sink(&self, ticket: SearchTicket) -> TicketSink<'_> {
        TicketSink {
            tracker: self,
            ticket,
        }
    }
}

pub struct TicketSink<'a> {
    tracker: &'a SessionTracker,
    ticket: SearchTicket,
}

#[async_trait]
impl PhaseSink for TicketSink<'_> {
    async fn enter(&self, phase: SearchPhase) {
        self.tracker.advance(self.ticket, phase).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{candidate, session_for};
    use crate::ranker::RankedOffice;
    use crate::snapshot::JsonFileSnapshotStore;

    fn presented(place_ids: &[&str]) -> PresentedSession {
        let offices = place_ids
            .iter()
            .map(|id| RankedOffice {
                office: candidate(id, id),
                distance_miles: Some(1.0),
                tier: None,
            })
            .collect::<Vec<_>>();
        present(session_for(10, offices.len()), offices)
    }

    fn tracker(dir: &tempfile::TempDir) -> SessionTracker {
        SessionTracker::new(Arc::new(JsonFileSnapshotStore::new(dir.path())))
    }

    #[tokio::test]
    async fn last_search_wins() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();

        let first = tracker.begin(user).await;
        let second = tracker.begin(user).await;

        assert!(tracker.finish(second, &Ok(presented(&["newer"]))).await);
        assert!(!tracker.finish(first, &Ok(presented(&["older"]))).await);

        let current = tracker.current(user).await;
        assert_eq!(current.phase, SearchPhase::Presented);
        let offices = current.presented.expect("presented").offices;
        assert_eq!(offices[0].office.place_id, "newer");
    }

    #[tokio::test]
    async fn stale_phase_updates_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();

        let first = tracker.begin(user).await;
        let _second = tracker.begin(user).await;

        assert!(!tracker.advance(first, SearchPhase::CacheHit).await);
        assert_eq!(tracker.current(user).await.phase, SearchPhase::Searching);
    }

    #[tokio::test]
    async fn phases_follow_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();
        let ticket = tracker.begin(user).await;

        assert!(!tracker.advance(ticket, SearchPhase::Presented).await);
        assert!(tracker.advance(ticket, SearchPhase::AwaitingExternalCall).await);
        assert!(tracker.advance(ticket, SearchPhase::Ranked).await);
        assert!(tracker.current(user).await.phase.is_loading());
    }

    #[tokio::test]
    async fn clear_invalidates_running_search() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();
        let ticket = tracker.begin(user).await;

        tracker.clear(user).await;

        assert!(!tracker.finish(ticket, &Ok(presented(&["late"]))).await);
        let current = tracker.current(user).await;
        assert_eq!(current.phase, SearchPhase::Idle);
        assert!(current.presented.is_none());
    }

    #[tokio::test]
    async fn failure_is_recorded_and_next_search_can_start() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();

        let ticket = tracker.begin(user).await;
        tracker
            .finish(ticket, &Err(DiscoveryError::MissingClinicLocation))
            .await;
        assert_eq!(tracker.current(user).await.phase, SearchPhase::Failed);

        tracker.begin(user).await;
        assert_eq!(tracker.current(user).await.phase, SearchPhase::Searching);
    }

    #[tokio::test]
    async fn presented_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        {
            let tracker = tracker(&dir);
            let ticket = tracker.begin(user).await;
            tracker.finish(ticket, &Ok(presented(&["ChIJabc"]))).await;
        }

        let restarted = tracker(&dir);
        let current = restarted.current(user).await;
        assert_eq!(current.phase, SearchPhase::Presented);
        assert_eq!(current.presented.expect("restored").offices.len(), 1);
    }

    #[tokio::test]
    async fn interrupted_search_restores_as_idle() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        {
            let tracker = tracker(&dir);
            tracker.begin(user).await;
        }
        assert_eq!(tracker(&dir).current(user).await.phase, SearchPhase::Idle);
    }

    #[tokio::test]
    async fn imported_offices_leave_new_opportunities() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();
        let ticket = tracker.begin(user).await;
        let result = presented(&["a", "b"]);
        let target = result.offices[0].office.id;
        tracker.finish(ticket, &Ok(result)).await;

        assert_eq!(tracker.importable(user, &[target]).await.len(), 1);
        assert_eq!(tracker.mark_imported(user, &[target]).await, 1);
        assert!(tracker.importable(user, &[target]).await.is_empty());

        let summary = tracker.current(user).await.presented.unwrap().summary;
        assert_eq!(summary.new_opportunities, 1);
        assert_eq!(summary.already_in_network, 1);
    }

    #[tokio::test]
    async fn clear_drops_in_memory_slot() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();
        let ticket = tracker.begin(user).await;
        tracker.finish(ticket, &Ok(presented(&["a"]))).await;
        assert_eq!(tracker.tracked_users().await, 1);

        tracker.clear(user).await;

        assert_eq!(tracker.tracked_users().await, 0);
        assert_eq!(tracker.current(user).await.phase, SearchPhase::Idle);
        assert!(tracker.current(user).await.presented.is_none());
    }

    #[tokio::test]
    async fn ticket_from_before_clear_does_not_match_new_search() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = Uuid::new_v4();
        let stale = tracker.begin(user).await;
        tracker.clear(user).await;
        let fresh = tracker.begin(user).await;

        assert!(!tracker.advance(stale, SearchPhase::CacheHit).await);
        assert!(!tracker.finish(stale, &Ok(presented(&["old"]))).await);
        assert!(tracker.finish(fresh, &Ok(presented(&["new"]))).await);
        let offices = tracker.current(user).await.presented.expect("presented").offices;
        assert_eq!(offices[0].office.place_id, "new");
    }

    #[tokio::test]
    async fn one_user_holding_a_slot_does_not_block_another() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let busy = Uuid::new_v4();
        let other = Uuid::new_v4();
        tracker.begin(busy).await;

        let _held = tracker.lock_user(busy).await;
        let ticket = tokio::time::timeout(std::time::Duration::from_secs(1), tracker.begin(other))
            .await
            .expect("other user proceeds while the first slot is locked");
        assert_eq!(ticket.user_id, other);
    }

    #[tokio::test]
    async fn import_works_from_restored_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        let target = {
            let tracker = tracker(&dir);
            let ticket = tracker.begin(user).await;
            let result = presented(&["a", "b"]);
            let target = result.offices[1].office.id;
            tracker.finish(ticket, &Ok(result)).await;
            target
        };

        let restarted = tracker(&dir);
        assert_eq!(restarted.importable(user, &[target]).await.len(), 1);
    }
}
