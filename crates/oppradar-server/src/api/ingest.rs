use axum::{extract::State, Extension, Json};

use crate::middleware::RequestId;
use oppradar_ingest::{run_ingest, SourceOutcome};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

/// Runs one ingest pass over all active sources and reports per-source
/// outcomes. Sources that fail are reported as `failed`, never aborting
/// the pass, so a non-500 response means the pass itself ran.
pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SourceOutcome>>>, ApiError> {
    let outcomes = run_ingest(&state.pool, &state.ingest, &state.config)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ingest pass failed");
            ApiError::new(req_id.0.clone(), "internal_error", "ingest pass failed")
        })?;

    Ok(Json(ApiResponse {
        data: outcomes,
        meta: ResponseMeta::new(req_id.0),
    }))
}
