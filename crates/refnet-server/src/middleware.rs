use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The user a request acts for, stored as a request extension by
/// [`require_bearer_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

#[derive(Debug, Clone)]
struct ApiKey {
    token: String,
    user_id: Uuid,
}

/// Bearer token auth settings used by middleware.
///
/// Every token is bound to exactly one user. With auth disabled the user is
/// taken from the `x-user-id` header instead.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<Vec<ApiKey>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `REFNET_API_KEYS`.
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("REFNET_API_KEYS").unwrap_or_default();
        Self::parse(&raw, is_development)
    }

    /// Parses comma-separated `token:user-uuid` pairs.
    pub fn parse(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((token, user)) = entry.rsplit_once(':') else {
                anyhow::bail!("REFNET_API_KEYS entries must be token:user-uuid pairs");
            };
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("REFNET_API_KEYS contains an empty token");
            }
            let user_id = Uuid::parse_str(user.trim())
                .map_err(|e| anyhow::anyhow!("REFNET_API_KEYS has an invalid user id: {e}"))?;
            keys.push(ApiKey {
                token: token.to_string(),
                user_id,
            });
        }

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "REFNET_API_KEYS not set; bearer auth disabled, users identified by {USER_ID_HEADER}"
                );
                return Ok(Self {
                    keys: Arc::new(Vec::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "REFNET_API_KEYS is required outside development; provide comma-separated token:user-uuid pairs"
            );
        }

        Ok(Self {
            keys: Arc::new(keys),
            enabled: true,
        })
    }

    /// Resolves a token to its user. Every key is compared in constant time.
    fn user_for(&self, token: &str) -> Option<Uuid> {
        let mut found = None;
        for key in self.keys.iter() {
            if bool::from(key.token.as_bytes().ct_eq(token.as_bytes())) {
                found = Some(key.user_id);
            }
        }
        found
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Sliding fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the acting user.
///
/// With auth enabled the bearer token selects the user; otherwise the
/// `x-user-id` header does.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = if auth.enabled {
        match extract_bearer_token(req.headers().get(AUTHORIZATION)).and_then(|t| auth.user_for(t))
        {
            Some(user) => user,
            None => {
                return reject(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "missing or invalid bearer token",
                )
            }
        }
    } else {
        match extract_user_header(req.headers()) {
            Some(user) => user,
            None => {
                return reject(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "missing or invalid x-user-id header",
                )
            }
        }
    };

    req.extensions_mut().insert(AuthenticatedUser(user));
    next.run(req).await
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

fn extract_user_header(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}
