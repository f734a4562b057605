use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use oppradar_core::NichePriority;
use oppradar_db::{NewNiche, NicheRow, NicheUpdate};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct NicheItem {
    pub id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub priority: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NicheRow> for NicheItem {
    fn from(row: NicheRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            keywords: row.keywords,
            priority: row.priority,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Keywords arrive either as a JSON array or a comma-separated string;
/// both normalize to trimmed, non-empty entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum KeywordsInput {
    List(Vec<String>),
    Csv(String),
}

impl KeywordsInput {
    fn normalize(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            KeywordsInput::List(list) => list,
            KeywordsInput::Csv(csv) => csv.split(',').map(String::from).collect(),
        };
        raw.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateNicheRequest {
    pub name: String,
    pub keywords: KeywordsInput,
    pub priority: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateNicheRequest {
    pub name: Option<String>,
    pub keywords: Option<KeywordsInput>,
    pub priority: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedData {
    pub deleted: bool,
}

fn validate_priority(req_id: &str, raw: &str) -> Result<(), ApiError> {
    if NichePriority::parse(raw).is_none() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("unknown priority '{raw}'"),
        ));
    }
    Ok(())
}

pub(super) async fn list_niches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<NicheItem>>>, ApiError> {
    let rows = oppradar_db::list_niches(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(NicheItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_niche(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<NicheItem>>, ApiError> {
    let row = oppradar_db::get_niche(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_niche(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateNicheRequest>,
) -> Result<Json<ApiResponse<NicheItem>>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "name is required",
        ));
    }

    let keywords = body.keywords.normalize();
    if keywords.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "at least one keyword is required",
        ));
    }

    let priority = body.priority.unwrap_or_else(|| "medium".to_string());
    validate_priority(&req_id.0, &priority)?;

    let row = oppradar_db::create_niche(
        &state.pool,
        &NewNiche {
            name: name.to_string(),
            keywords,
            priority,
            description: body.description,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_niche(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateNicheRequest>,
) -> Result<Json<ApiResponse<NicheItem>>, ApiError> {
    if let Some(priority) = body.priority.as_deref() {
        validate_priority(&req_id.0, priority)?;
    }

    let keywords = match body.keywords.map(KeywordsInput::normalize) {
        Some(list) if list.is_empty() => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "keywords cannot be emptied",
            ));
        }
        other => other,
    };

    let update = NicheUpdate {
        name: body.name,
        keywords,
        priority: body.priority,
        description: body.description,
        is_active: body.is_active,
    };

    let row = oppradar_db::update_niche(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_niche(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedData>>, ApiError> {
    oppradar_db::delete_niche(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DeletedData { deleted: true },
        meta: ResponseMeta::new(req_id.0),
    }))
}
