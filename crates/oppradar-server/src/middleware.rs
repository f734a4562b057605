use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Settings for the scheduler-auth gate in front of `/ingest` and
/// `/analyze`.
///
/// A request passes when any of the following holds:
/// - the `x-scheduled-run: 1` header is present (platform cron),
/// - `Authorization: Bearer <secret>` matches the configured secret,
/// - the `?secret=` query parameter matches,
/// - the environment is development.
///
/// Secret comparisons are constant-time.
#[derive(Debug, Clone)]
pub struct SchedulerAuthState {
    secret: Option<Arc<str>>,
    dev_mode: bool,
}

impl SchedulerAuthState {
    #[must_use]
    pub fn new(secret: Option<&str>, dev_mode: bool) -> Self {
        if secret.is_none() && !dev_mode {
            tracing::warn!(
                "no cron secret configured outside development; \
                 only the scheduled-run header will be accepted"
            );
        }
        Self {
            secret: secret.map(Into::into),
            dev_mode,
        }
    }

    #[must_use]
    pub fn from_config(config: &oppradar_core::AppConfig) -> Self {
        Self::new(
            config.cron_secret.as_deref(),
            config.env == oppradar_core::Environment::Development,
        )
    }

    fn secret_matches(&self, candidate: &str) -> bool {
        self.secret
            .as_deref()
            .is_some_and(|secret| secret.as_bytes().ct_eq(candidate.as_bytes()).into())
    }

    fn allows(&self, req: &Request) -> bool {
        if self.dev_mode {
            return true;
        }

        if req
            .headers()
            .get("x-scheduled-run")
            .and_then(|v| v.to_str().ok())
            == Some("1")
        {
            return true;
        }

        if let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) {
            if self.secret_matches(token) {
                return true;
            }
        }

        if let Some(secret) = query_param(req.uri().query(), "secret") {
            if self.secret_matches(secret) {
                return true;
            }
        }

        false
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
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

/// Middleware gating the trigger endpoints behind scheduler auth. Rejected
/// requests never reach the handler, so no scrape or analysis side effect
/// happens.
pub async fn require_scheduler_auth(
    State(auth): State<SchedulerAuthState>,
    req: Request,
    next: Next,
) -> Response {
    if auth.allows(&req) {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(MiddlewareErrorBody {
            error: MiddlewareError {
                code: "unauthorized",
                message: "missing or invalid scheduler credentials",
            },
        }),
    )
        .into_response()
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
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
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

/// Pull a raw query parameter value. The cron secret is restricted to
/// URL-safe characters, so no percent-decoding is needed here.
fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn query_param_finds_secret() {
        assert_eq!(query_param(Some("a=1&secret=s3cret"), "secret"), Some("s3cret"));
        assert_eq!(query_param(Some("a=1"), "secret"), None);
        assert_eq!(query_param(None, "secret"), None);
    }

    #[test]
    fn scheduled_run_header_is_accepted() {
        let auth = SchedulerAuthState::new(Some("s3cret"), false);
        assert!(auth.allows(&request("/api/v1/ingest", &[("x-scheduled-run", "1")])));
        assert!(!auth.allows(&request("/api/v1/ingest", &[("x-scheduled-run", "yes")])));
    }

    #[test]
    fn bearer_secret_must_match_exactly() {
        let auth = SchedulerAuthState::new(Some("s3cret"), false);
        assert!(auth.allows(&request("/x", &[("authorization", "Bearer s3cret")])));
        assert!(!auth.allows(&request("/x", &[("authorization", "Bearer wrong")])));
        assert!(!auth.allows(&request("/x", &[("authorization", "Bearer s3cret2")])));
    }

    #[test]
    fn query_secret_is_accepted() {
        let auth = SchedulerAuthState::new(Some("s3cret"), false);
        assert!(auth.allows(&request("/x?secret=s3cret", &[])));
        assert!(!auth.allows(&request("/x?secret=nope", &[])));
    }

    #[test]
    fn dev_mode_allows_everything() {
        let auth = SchedulerAuthState::new(None, true);
        assert!(auth.allows(&request("/x", &[])));
    }

    #[test]
    fn missing_secret_outside_dev_rejects_credentials() {
        let auth = SchedulerAuthState::new(None, false);
        assert!(!auth.allows(&request("/x?secret=anything", &[])));
        assert!(auth.allows(&request("/x", &[("x-scheduled-run", "1")])));
    }
}
