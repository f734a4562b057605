use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::middleware::RequestId;
use oppradar_analyze::{run_analysis_batch, AnalysisRunSummary, Provider};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct AnalyzeRequest {
    pub limit: Option<i64>,
    pub provider: Option<String>,
}

/// Runs one analysis batch over the unresolved-post backlog.
///
/// The body is optional so cron GETs work with defaults: the configured
/// batch limit and Claude as the starting provider.
pub(super) async fn trigger_analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<AnalyzeRequest>>,
) -> Result<Json<ApiResponse<AnalysisRunSummary>>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let provider = match request.provider.as_deref() {
        None => Provider::Claude,
        Some(raw) => Provider::parse(raw).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("unknown provider '{raw}'"),
            )
        })?,
    };

    let limit = request
        .limit
        .unwrap_or(state.config.analyze_default_limit)
        .clamp(1, 200);

    let summary = run_analysis_batch(&state.pool, &state.analysis, &state.config, limit, provider)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "analysis batch failed");
            ApiError::new(req_id.0.clone(), "internal_error", "analysis batch failed")
        })?;

    Ok(Json(ApiResponse {
        data: summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}
