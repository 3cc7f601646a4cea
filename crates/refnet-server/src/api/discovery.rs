//! Discovery search, session and import handlers.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use refnet_core::{DiscoveryParameters, DiscoverySession};
use refnet_discovery::{
    ApiUsage, DiscoveryError, DiscoverySummary, NetworkMember, PresentedSession, RankedOffice,
    Recommendation, SearchPhase, SearchResult, SortKey, TrackedSession,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthenticatedUser, RequestId};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct SearchRequest {
    pub distance: u32,
    pub zip_code_override: Option<String>,
    pub office_type_filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SessionQuery {
    pub sort: Option<String>,
    #[serde(default)]
    pub show_already_added: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImportRequest {
    pub office_ids: Vec<Uuid>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// What the client renders for the current search.
#[derive(Debug, Serialize)]
pub(super) struct SessionView {
    pub phase: SearchPhase,
    pub loading: bool,
    pub session: Option<DiscoverySession>,
    pub summary: Option<DiscoverySummary>,
    pub recommendation: Option<Recommendation>,
    pub offices: Vec<RankedOffice>,
}

impl SessionView {
    fn idle() -> Self {
        Self::from_tracked(
            TrackedSession {
                phase: SearchPhase::Idle,
                presented: None,
            },
            false,
            SortKey::default(),
        )
    }

    fn from_presented(presented: PresentedSession, show_already_added: bool, sort: SortKey) -> Self {
        Self::from_tracked(
            TrackedSession {
                phase: SearchPhase::Presented,
                presented: Some(presented),
            },
            show_already_added,
            sort,
        )
    }

    fn from_tracked(tracked: TrackedSession, show_already_added: bool, sort: SortKey) -> Self {
        let phase = tracked.phase;
        match tracked.presented {
            Some(presented) => Self {
                phase,
                loading: phase.is_loading(),
                offices: presented.visible(show_already_added, sort),
                session: Some(presented.session),
                summary: Some(presented.summary),
                recommendation: presented.recommendation,
            },
            None => Self {
                phase,
                loading: phase.is_loading(),
                session: None,
                summary: None,
                recommendation: None,
                offices: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ImportResponse {
    pub imported: Vec<NetworkMember>,
    pub skipped: usize,
    pub summary: Option<DiscoverySummary>,
}

fn parse_sort(req_id: &str, raw: Option<&str>) -> Result<SortKey, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(SortKey::default()),
        Some(value) => value
            .parse()
            .map_err(|e: String| ApiError::new(req_id, "validation_error", e)),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn start_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let params = DiscoveryParameters::new(body.distance, body.zip_code_override, body.office_type_filter)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    tracing::info!(
        %user_id,
        distance = params.distance_miles(),
        zip_override = params.zip_code_override().is_some(),
        "discovery search requested"
    );

    match state.service.search(user_id, params).await {
        SearchResult::Presented(presented) => Ok(Json(ApiResponse {
            data: SessionView::from_presented(presented, false, SortKey::default()),
            meta: ResponseMeta::new(req_id.0),
        })),
        SearchResult::Failed(notification) => {
            Err(ApiError::from_notification(req_id.0, notification))
        }
        SearchResult::Superseded => Err(ApiError::new(
            req_id.0,
            "superseded",
            "a newer search replaced this one",
        )),
    }
}

pub(super) async fn get_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let sort = parse_sort(&req_id.0, query.sort.as_deref())?;
    let tracked = state.service.current(user_id).await;

    Ok(Json(ApiResponse {
        data: SessionView::from_tracked(tracked, query.show_already_added, sort),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn clear_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<SessionView>> {
    state.service.clear(user_id).await;
    Json(ApiResponse {
        data: SessionView::idle(),
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn import_offices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ApiResponse<ImportResponse>>, ApiError> {
    if body.office_ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "office_ids must not be empty",
        ));
    }

    let outcome = state
        .service
        .import(user_id, &body.office_ids)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ImportResponse {
            imported: outcome.imported,
            skipped: outcome.skipped,
            summary: outcome.summary,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<ApiUsage>>, ApiError> {
    let usage = state.service.usage(user_id).await.ok_or_else(|| {
        ApiError::new(req_id.0.clone(), "internal_error", "usage is unavailable")
    })?;

    Ok(Json(ApiResponse {
        data: usage,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn map_discovery_error(request_id: String, error: &DiscoveryError) -> ApiError {
    tracing::error!(error = %error, "discovery request failed");
    ApiError::from_notification(request_id, error.notification())
}
