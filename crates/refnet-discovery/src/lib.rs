//! Office discovery: origin resolution, cache-first places lookup, distance
//! ranking, network deduplication and session presentation.
//!
//! Every external interaction goes through a trait in [`ports`] so the
//! workflow can run against Postgres and HTTP in production and against
//! in-memory fakes in tests.

pub mod dedup;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod locator;
pub mod ports;
pub mod presenter;
pub(crate) mod retry;
pub mod ranker;
pub mod service;
pub mod snapshot;
pub mod state;
pub mod tracker;
pub mod workflow;

#[cfg(test)]
pub(crate) mod fakes;

pub use dedup::{mark_network_members, NetworkIndex};
pub use error::{ApiUsage, DiscoveryError, Notification, NotificationKind, PlacesError, StoreError};
pub use geo::{haversine_miles, EARTH_RADIUS_MILES};
pub use locator::{normalize_zip5, resolve_origin, ResolvedOrigin};
pub use ports::{
    ClinicProfile, ClinicProfileReader, DiscoveryCache, NetworkMember, NetworkReader,
    NetworkWriter, NoopPhaseSink, PhaseSink, PlacesProvider, PlacesQuery, TierReader,
    UsageReader, ZipGeocoder,
};
pub use presenter::{present, recommendation, DiscoverySummary, PresentedSession, Recommendation};
pub use ranker::{rank_offices, sort_offices, RankedOffice, SortKey};
pub use service::{Collaborators, DiscoveryService, ImportOutcome, SearchResult};
pub use snapshot::{JsonFileSnapshotStore, SessionSnapshot, SnapshotStore};
pub use state::{InvalidTransition, SearchPhase};
pub use tracker::{SearchTicket, SessionTracker, TicketSink, TrackedSession};
pub use workflow::{DiscoveryWorkflow, WorkflowSettings};
