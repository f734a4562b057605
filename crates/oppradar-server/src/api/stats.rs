use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use oppradar_db::{BreakdownRow, ScrapeLogWithSource, StatsSummary};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct StatsData {
    pub total_opportunities: i64,
    pub new_opportunities: i64,
    pub starred_opportunities: i64,
    pub average_overall_score: Option<f64>,
    pub by_status: Vec<BreakdownItem>,
    pub by_priority: Vec<BreakdownItem>,
    pub raw_posts_total: i64,
    pub raw_posts_unresolved: i64,
    pub recent_scrape_logs: Vec<ScrapeLogItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct BreakdownItem {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeLogItem {
    pub id: i64,
    pub source_id: i64,
    pub platform: String,
    pub display_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub posts_found: i32,
    pub posts_new: i32,
    pub error_message: Option<String>,
}

impl From<BreakdownRow> for BreakdownItem {
    fn from(row: BreakdownRow) -> Self {
        Self {
            label: row.label,
            count: row.count,
        }
    }
}

impl From<ScrapeLogWithSource> for ScrapeLogItem {
    fn from(row: ScrapeLogWithSource) -> Self {
        Self {
            id: row.id,
            source_id: row.source_id,
            platform: row.platform,
            display_name: row.display_name,
            started_at: row.started_at,
            completed_at: row.completed_at,
            posts_found: row.posts_found,
            posts_new: row.posts_new,
            error_message: row.error_message,
        }
    }
}

impl From<StatsSummary> for StatsData {
    fn from(summary: StatsSummary) -> Self {
        Self {
            total_opportunities: summary.total_opportunities,
            new_opportunities: summary.new_opportunities,
            starred_opportunities: summary.starred_opportunities,
            average_overall_score: summary.average_overall_score,
            by_status: summary.by_status.into_iter().map(Into::into).collect(),
            by_priority: summary.by_priority.into_iter().map(Into::into).collect(),
            raw_posts_total: summary.raw_posts_total,
            raw_posts_unresolved: summary.raw_posts_unresolved,
            recent_scrape_logs: summary
                .recent_scrape_logs
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let summary = oppradar_db::collect_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: summary.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{body_json, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_start_at_zero_on_an_empty_database(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total_opportunities"].as_i64(), Some(0));
        assert_eq!(json["data"]["new_opportunities"].as_i64(), Some(0));
        assert_eq!(json["data"]["raw_posts_unresolved"].as_i64(), Some(0));
        assert!(json["data"]["average_overall_score"].is_null());
        assert_eq!(
            json["data"]["recent_scrape_logs"].as_array().map(Vec::len),
            Some(0)
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_count_new_opportunities_separately(pool: sqlx::PgPool) {
        let app = test_app(pool);

        // Two manual entries start in 'new'; one moves on to review.
        let mut ids = Vec::new();
        for title in ["Review queue entry", "Moved along"] {
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
                                "problem_statement": "Recurring manual work."
                            })
                            .to_string(),
                        ))
                        .expect("request"),
                )
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            ids.push(body_json(response).await["data"]["id"].as_i64().expect("id"));
        }

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/opportunities/{}", ids[1]))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "status": "reviewing" }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total_opportunities"].as_i64(), Some(2));
        assert_eq!(json["data"]["new_opportunities"].as_i64(), Some(1));
        assert_eq!(json["data"]["starred_opportunities"].as_i64(), Some(0));
    }
}
