mod analyze;
mod ingest;
mod niches;
mod opportunities;
mod research;
mod sources;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use oppradar_analyze::AnalysisClient;
use oppradar_core::AppConfig;
use oppradar_ingest::IngestClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_scheduler_auth, RateLimitState, RequestId,
    SchedulerAuthState,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub ingest: IngestClient,
    pub analysis: AnalysisClient,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &oppradar_db::DbError) -> ApiError {
    match error {
        oppradar_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "record not found")
        }
        oppradar_db::DbError::EmptyUpdate => ApiError::new(
            request_id,
            "validation_error",
            "no updatable fields in request",
        ),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-scheduled-run"),
        ])
}

/// Pipeline trigger endpoints. GET is accepted alongside POST because
/// hosted cron services only issue GETs.
fn trigger_router(auth: SchedulerAuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/ingest",
            get(ingest::trigger_ingest).post(ingest::trigger_ingest),
        )
        .route(
            "/api/v1/analyze",
            get(analyze::trigger_analyze).post(analyze::trigger_analyze),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_scheduler_auth,
        ))
}

fn crud_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/opportunities",
            get(opportunities::list_opportunities).post(opportunities::create_opportunity),
        )
        .route(
            "/api/v1/opportunities/{id}",
            get(opportunities::get_opportunity)
                .patch(opportunities::update_opportunity)
                .delete(opportunities::delete_opportunity),
        )
        .route(
            "/api/v1/research",
            get(research::list_research).post(research::generate_research),
        )
        .route(
            "/api/v1/sources",
            get(sources::list_sources).post(sources::create_source),
        )
        .route("/api/v1/sources/{id}", axum::routing::patch(sources::update_source))
        .route(
            "/api/v1/niches",
            get(niches::list_niches).post(niches::create_niche),
        )
        .route(
            "/api/v1/niches/{id}",
            get(niches::get_niche)
                .put(niches::update_niche)
                .delete(niches::delete_niche),
        )
        .route("/api/v1/stats", get(stats::get_stats))
}

pub fn build_app(
    state: AppState,
    auth: SchedulerAuthState,
    rate_limit: RateLimitState,
) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    let limited_routes = Router::new()
        .merge(crud_router())
        .merge(trigger_router(auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new()
        .merge(public_routes)
        .merge(limited_routes)
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match oppradar_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tower::ServiceExt;

    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            database_url: "unused".to_string(),
            env: oppradar_core::Environment::Test,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            cron_secret: Some("test-cron-secret".to_string()),
            anthropic_api_key: Some("test-key".to_string()),
            openai_api_key: Some("test-key".to_string()),
            claude_model: "claude-sonnet-4-20250514".to_string(),
            openai_model: "gpt-4o".to_string(),
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            ingest_request_timeout_secs: 5,
            ingest_user_agent: "oppradar-test/0.1".to_string(),
            ingest_hn_item_limit: 30,
            ingest_inter_source_delay_ms: 0,
            analyze_default_limit: 10,
            analyze_overfetch_factor: 3,
            analyze_inter_call_delay_ms: 0,
            analyze_request_timeout_secs: 5,
        }
    }

    pub(crate) fn test_app(pool: sqlx::PgPool) -> Router {
        let config = Arc::new(test_config());
        let ingest = IngestClient::from_config(&config).expect("ingest client");
        let analysis = AnalysisClient::from_config(&config).expect("analysis client");
        let auth = SchedulerAuthState::from_config(&config);
        build_app(
            AppState {
                pool,
                config,
                ingest,
                analysis,
            },
            auth,
            default_rate_limit_state(),
        )
    }

    pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn map_db_error_distinguishes_not_found_and_empty_update() {
        let e = map_db_error("r".to_string(), &oppradar_db::DbError::NotFound);
        assert_eq!(e.error.code, "not_found");
        let e = map_db_error("r".to_string(), &oppradar_db::DbError::EmptyUpdate);
        assert_eq!(e.error.code, "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok_with_request_id(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "health-req-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.to_str().ok()),
            Some(Some("health-req-1"))
        );
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert_eq!(json["meta"]["request_id"].as_str(), Some("health-req-1"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trigger_endpoints_reject_missing_credentials(pool: sqlx::PgPool) {
        let app = test_app(pool);
        for uri in ["/api/v1/ingest", "/api/v1/analyze"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn scheduled_run_header_reaches_trigger_handler(pool: sqlx::PgPool) {
        // No sources seeded, so the run completes with an empty outcome list.
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/ingest")
                    .header("x-scheduled-run", "1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
    }
}
