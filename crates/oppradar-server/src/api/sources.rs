use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use oppradar_core::SourcePlatform;
use oppradar_db::{NewSource, SourceRow, SourceUpdate};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_SCRAPE_FREQUENCY_HOURS: i32 = 6;

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
    pub id: i64,
    pub platform: String,
    pub identifier: String,
    pub display_name: String,
    pub scrape_frequency_hours: i32,
    pub is_active: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SourceRow> for SourceItem {
    fn from(row: SourceRow) -> Self {
        Self {
            id: row.id,
            platform: row.platform,
            identifier: row.identifier,
            display_name: row.display_name,
            scrape_frequency_hours: row.scrape_frequency_hours,
            is_active: row.is_active,
            last_scraped_at: row.last_scraped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateSourceRequest {
    pub platform: String,
    pub identifier: String,
    pub display_name: Option<String>,
    pub scrape_frequency_hours: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateSourceRequest {
    pub display_name: Option<String>,
    pub identifier: Option<String>,
    pub scrape_frequency_hours: Option<i32>,
    pub is_active: Option<bool>,
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SourceItem>>>, ApiError> {
    let rows = oppradar_db::list_sources(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SourceItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateSourceRequest>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    // Only platforms with a transport can be scraped.
    if SourcePlatform::parse(&body.platform) == SourcePlatform::Other {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("unsupported platform '{}'", body.platform),
        ));
    }

    let identifier = body.identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "identifier is required",
        ));
    }

    let frequency = body
        .scrape_frequency_hours
        .unwrap_or(DEFAULT_SCRAPE_FREQUENCY_HOURS);
    if frequency < 1 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "scrape_frequency_hours must be at least 1",
        ));
    }

    let row = oppradar_db::create_source(
        &state.pool,
        &NewSource {
            platform: body.platform,
            identifier: identifier.to_string(),
            display_name: body
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| identifier.to_string()),
            scrape_frequency_hours: frequency,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSourceRequest>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    if let Some(frequency) = body.scrape_frequency_hours {
        if frequency < 1 {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "scrape_frequency_hours must be at least 1",
            ));
        }
    }

    let update = SourceUpdate {
        display_name: body.display_name,
        identifier: body.identifier,
        scrape_frequency_hours: body.scrape_frequency_hours,
        is_active: body.is_active,
    };

    let row = oppradar_db::update_source(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
