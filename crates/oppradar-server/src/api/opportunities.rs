use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use oppradar_core::{NichePriority, OpportunityStatus};
use oppradar_db::{OpportunityFilter, OpportunityRow, OpportunityUpdate, RawPostRow};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct OpportunitiesQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub starred: Option<bool>,
    pub min_score: Option<f64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct OpportunityItem {
    pub id: i64,
    pub raw_post_id: Option<i64>,
    pub title: String,
    pub problem_statement: String,
    pub proposed_solution: Option<String>,
    pub target_audience: Option<String>,
    pub pain_intensity_score: i32,
    pub market_size_score: i32,
    pub technical_feasibility_score: i32,
    pub competition_score: i32,
    pub monetization_potential_score: i32,
    pub overall_score: f64,
    pub ai_analysis_summary: Option<String>,
    pub similar_existing_products: Vec<String>,
    pub suggested_mvp_features: Vec<String>,
    pub estimated_build_time: Option<String>,
    pub suggested_pricing_model: Option<String>,
    pub keywords: Vec<String>,
    pub status: String,
    pub priority: String,
    pub notes: Option<String>,
    pub is_starred: bool,
    pub analyzed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OpportunityRow> for OpportunityItem {
    fn from(row: OpportunityRow) -> Self {
        Self {
            id: row.id,
            raw_post_id: row.raw_post_id,
            title: row.title,
            problem_statement: row.problem_statement,
            proposed_solution: row.proposed_solution,
            target_audience: row.target_audience,
            pain_intensity_score: row.pain_intensity_score,
            market_size_score: row.market_size_score,
            technical_feasibility_score: row.technical_feasibility_score,
            competition_score: row.competition_score,
            monetization_potential_score: row.monetization_potential_score,
            overall_score: row.overall_score,
            ai_analysis_summary: row.ai_analysis_summary,
            similar_existing_products: row.similar_existing_products,
            suggested_mvp_features: row.suggested_mvp_features,
            estimated_build_time: row.estimated_build_time,
            suggested_pricing_model: row.suggested_pricing_model,
            keywords: row.keywords,
            status: row.status,
            priority: row.priority,
            notes: row.notes,
            is_starred: row.is_starred,
            analyzed_at: row.analyzed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OpportunityPageData {
    pub items: Vec<OpportunityItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct SourcePostItem {
    pub id: i64,
    pub source_id: i64,
    pub external_id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub score: i32,
    pub comment_count: i32,
    pub posted_at: Option<DateTime<Utc>>,
}

impl From<RawPostRow> for SourcePostItem {
    fn from(row: RawPostRow) -> Self {
        Self {
            id: row.id,
            source_id: row.source_id,
            external_id: row.external_id,
            title: row.title,
            body: row.body,
            author: row.author,
            url: row.url,
            score: row.score,
            comment_count: row.comment_count,
            posted_at: row.posted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OpportunityDetail {
    #[serde(flatten)]
    pub opportunity: OpportunityItem,
    pub raw_post: Option<SourcePostItem>,
    pub research: Vec<super::research::ResearchItem>,
    pub reactions: Vec<ReactionItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReactionItem {
    pub id: i64,
    pub action_type: String,
    pub action_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOpportunityRequest {
    pub title: String,
    pub problem_statement: String,
    pub proposed_solution: Option<String>,
    pub target_audience: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOpportunityRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub is_starred: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedData {
    pub deleted: bool,
}

fn validate_status(req_id: &str, raw: &str) -> Result<(), ApiError> {
    if OpportunityStatus::parse(raw).is_none() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("unknown status '{raw}'"),
        ));
    }
    Ok(())
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

pub(super) async fn list_opportunities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OpportunitiesQuery>,
) -> Result<Json<ApiResponse<OpportunityPageData>>, ApiError> {
    if let Some(status) = query.status.as_deref() {
        validate_status(&req_id.0, status)?;
    }
    if let Some(priority) = query.priority.as_deref() {
        validate_priority(&req_id.0, priority)?;
    }

    let filter = OpportunityFilter {
        status: query.status,
        priority: query.priority,
        min_score: query.min_score,
        is_starred: query.starred,
        search: query.search.filter(|s| !s.trim().is_empty()),
        sort_by: query.sort_by,
        sort_descending: query.sort_order.as_deref() != Some("asc"),
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let page = oppradar_db::list_opportunities(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OpportunityPageData {
            items: page.items.into_iter().map(OpportunityItem::from).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOpportunityRequest>,
) -> Result<Json<ApiResponse<OpportunityItem>>, ApiError> {
    let title = body.title.trim();
    let problem_statement = body.problem_statement.trim();
    if title.is_empty() || problem_statement.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "title and problem_statement are required",
        ));
    }

    let row = oppradar_db::insert_opportunity_manual(
        &state.pool,
        title,
        problem_statement,
        body.proposed_solution.as_deref(),
        body.target_audience.as_deref(),
        body.notes.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Full detail view: the opportunity plus its originating post, attached
/// research, and the reaction trail.
pub(super) async fn get_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OpportunityDetail>>, ApiError> {
    let row = oppradar_db::get_opportunity(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let raw_post = match row.raw_post_id {
        Some(post_id) => Some(
            oppradar_db::get_raw_post(&state.pool, post_id)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
        ),
        None => None,
    };

    let research = oppradar_db::list_research(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let reactions = oppradar_db::list_reactions(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OpportunityDetail {
            opportunity: row.into(),
            raw_post: raw_post.map(SourcePostItem::from),
            research: research
                .into_iter()
                .map(super::research::ResearchItem::from)
                .collect(),
            reactions: reactions
                .into_iter()
                .map(|r| ReactionItem {
                    id: r.id,
                    action_type: r.action_type,
                    action_data: r.action_data,
                    created_at: r.created_at,
                })
                .collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateOpportunityRequest>,
) -> Result<Json<ApiResponse<OpportunityItem>>, ApiError> {
    if let Some(status) = body.status.as_deref() {
        validate_status(&req_id.0, status)?;
    }
    if let Some(priority) = body.priority.as_deref() {
        validate_priority(&req_id.0, priority)?;
    }

    let update = OpportunityUpdate {
        status: body.status,
        priority: body.priority,
        notes: body.notes,
        is_starred: body.is_starred,
    };

    let row = oppradar_db::update_opportunity(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedData>>, ApiError> {
    oppradar_db::delete_opportunity(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DeletedData { deleted: true },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{body_json, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn create_via_api(app: &axum::Router, title: &str) -> i64 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/opportunities")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "title": title,
                            "problem_statement": "Manual reconciliation eats hours."
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        json["data"]["id"].as_i64().expect("id")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn manual_create_then_list_round_trips(pool: sqlx::PgPool) {
        let app = test_app(pool);
        create_via_api(&app, "Invoice matcher").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/opportunities?search=invoice")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total"].as_i64(), Some(1));
        assert_eq!(
            json["data"]["items"][0]["title"].as_str(),
            Some("Invoice matcher")
        );
        // Manual entries get neutral scores and land in the review queue.
        assert_eq!(json["data"]["items"][0]["status"].as_str(), Some("new"));
        assert_eq!(json["data"]["items"][0]["overall_score"].as_f64(), Some(5.0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_rejects_blank_title(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/opportunities")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "title": "   ",
                            "problem_statement": "something"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_rejects_unknown_status(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/opportunities?status=done")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn patch_updates_status_and_records_reaction(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let id = create_via_api(&app, "Status flow").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/opportunities/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "status": "validated", "is_starred": true })
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("validated"));
        assert_eq!(json["data"]["is_starred"].as_bool(), Some(true));

        // The detail view shows the reaction trail of that update.
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/opportunities/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = body_json(response).await;
        let reactions = json["data"]["reactions"].as_array().expect("reactions");
        let types: Vec<&str> = reactions
            .iter()
            .filter_map(|r| r["action_type"].as_str())
            .collect();
        assert!(types.contains(&"status_change"));
        assert!(types.contains(&"starred"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn patch_with_no_fields_is_a_validation_error(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let id = create_via_api(&app, "Empty patch").await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/opportunities/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn delete_then_get_returns_404(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let id = create_via_api(&app, "Short lived").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/opportunities/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/opportunities/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
