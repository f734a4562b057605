use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use oppradar_core::ResearchType;
use oppradar_db::{NewResearch, ResearchRow};
use oppradar_analyze::Provider;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ResearchItem {
    pub id: i64,
    pub opportunity_id: i64,
    pub research_type: String,
    pub title: String,
    pub content: String,
    pub sources: Vec<String>,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ResearchRow> for ResearchItem {
    fn from(row: ResearchRow) -> Self {
        Self {
            id: row.id,
            opportunity_id: row.opportunity_id,
            research_type: row.research_type,
            title: row.title,
            content: row.content,
            sources: row.sources,
            ai_generated: row.ai_generated,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateResearchRequest {
    pub opportunity_id: i64,
    pub research_type: String,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResearchQuery {
    pub opportunity_id: Option<i64>,
}

/// Generates one research document for an opportunity and persists it.
/// The first document attached to a `new` opportunity also moves it to
/// `researching`.
pub(super) async fn generate_research(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GenerateResearchRequest>,
) -> Result<Json<ApiResponse<ResearchItem>>, ApiError> {
    let research_type = ResearchType::parse(&body.research_type).ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("unknown research_type '{}'", body.research_type),
        )
    })?;

    let provider = match body.provider.as_deref() {
        None => Provider::Claude,
        Some(raw) => Provider::parse(raw).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("unknown provider '{raw}'"),
            )
        })?,
    };

    let opportunity = oppradar_db::get_opportunity(&state.pool, body.opportunity_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let generated = state
        .analysis
        .research(&opportunity, research_type, provider)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, opportunity_id = opportunity.id, "research generation failed");
            ApiError::new(
                req_id.0.clone(),
                "internal_error",
                "research generation failed",
            )
        })?;

    let row = oppradar_db::insert_research(
        &state.pool,
        opportunity.id,
        &NewResearch {
            research_type: research_type.as_str().to_string(),
            title: generated.title,
            content: generated.content,
            sources: generated.sources,
            ai_generated: true,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_research(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ResearchQuery>,
) -> Result<Json<ApiResponse<Vec<ResearchItem>>>, ApiError> {
    let opportunity_id = query.opportunity_id.ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "opportunity_id query parameter is required",
        )
    })?;

    let rows = oppradar_db::list_research(&state.pool, opportunity_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ResearchItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
