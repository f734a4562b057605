//! Database operations for the `opportunities` table.
//!
//! `overall_score` is a generated column (mean of the five sub-scores),
//! so inserts and updates never write it directly.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

const OPPORTUNITY_COLUMNS: &str = "id, raw_post_id, title, problem_statement, proposed_solution, \
     target_audience, pain_intensity_score, market_size_score, technical_feasibility_score, \
     competition_score, monetization_potential_score, overall_score, ai_analysis_summary, \
     similar_existing_products, suggested_mvp_features, estimated_build_time, \
     suggested_pricing_model, keywords, status, priority, notes, is_starred, analyzed_at, \
     created_at, updated_at";

/// A row from the `opportunities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityRow {
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

/// An opportunity produced by LLM analysis of a raw post.
#[derive(Debug, Clone)]
pub struct NewAnalyzedOpportunity {
    pub raw_post_id: i64,
    pub title: String,
    pub problem_statement: String,
    pub proposed_solution: Option<String>,
    pub target_audience: Option<String>,
    pub pain_intensity_score: i32,
    pub market_size_score: i32,
    pub technical_feasibility_score: i32,
    pub competition_score: i32,
    pub monetization_potential_score: i32,
    pub ai_analysis_summary: Option<String>,
    pub similar_existing_products: Vec<String>,
    pub suggested_mvp_features: Vec<String>,
    pub estimated_build_time: Option<String>,
    pub suggested_pricing_model: Option<String>,
    pub keywords: Vec<String>,
    pub priority: String,
}

/// Filters and pagination for listing opportunities.
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub min_score: Option<f64>,
    pub is_starred: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_descending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// A page of opportunities plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct OpportunityPage {
    pub items: Vec<OpportunityRow>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Sort columns exposed to API callers. Anything else falls back to
/// `overall_score` rather than reaching the query string.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("created_at") => "created_at",
        Some("updated_at") => "updated_at",
        Some("analyzed_at") => "analyzed_at",
        Some("title") => "title",
        Some("pain_intensity_score") => "pain_intensity_score",
        _ => "overall_score",
    }
}

/// Inserts an opportunity produced by post analysis and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including sub-score
/// range constraints).
pub async fn insert_opportunity_from_analysis(
    pool: &PgPool,
    opportunity: &NewAnalyzedOpportunity,
) -> Result<OpportunityRow, DbError> {
    let row = sqlx::query_as::<_, OpportunityRow>(&format!(
        "INSERT INTO opportunities \
             (raw_post_id, title, problem_statement, proposed_solution, target_audience, \
              pain_intensity_score, market_size_score, technical_feasibility_score, \
              competition_score, monetization_potential_score, ai_analysis_summary, \
              similar_existing_products, suggested_mvp_features, estimated_build_time, \
              suggested_pricing_model, keywords, priority) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING {OPPORTUNITY_COLUMNS}"
    ))
    .bind(opportunity.raw_post_id)
    .bind(&opportunity.title)
    .bind(&opportunity.problem_statement)
    .bind(&opportunity.proposed_solution)
    .bind(&opportunity.target_audience)
    .bind(opportunity.pain_intensity_score)
    .bind(opportunity.market_size_score)
    .bind(opportunity.technical_feasibility_score)
    .bind(opportunity.competition_score)
    .bind(opportunity.monetization_potential_score)
    .bind(&opportunity.ai_analysis_summary)
    .bind(&opportunity.similar_existing_products)
    .bind(&opportunity.suggested_mvp_features)
    .bind(&opportunity.estimated_build_time)
    .bind(&opportunity.suggested_pricing_model)
    .bind(&opportunity.keywords)
    .bind(&opportunity.priority)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Inserts a manually entered opportunity with neutral sub-scores and
/// returns it. Manual entries carry no raw post.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_opportunity_manual(
    pool: &PgPool,
    title: &str,
    problem_statement: &str,
    proposed_solution: Option<&str>,
    target_audience: Option<&str>,
    notes: Option<&str>,
) -> Result<OpportunityRow, DbError> {
    let row = sqlx::query_as::<_, OpportunityRow>(&format!(
        "INSERT INTO opportunities \
             (title, problem_statement, proposed_solution, target_audience, notes, \
              pain_intensity_score, market_size_score, technical_feasibility_score, \
              competition_score, monetization_potential_score) \
         VALUES ($1, $2, $3, $4, $5, 5, 5, 5, 5, 5) \
         RETURNING {OPPORTUNITY_COLUMNS}"
    ))
    .bind(title)
    .bind(problem_statement)
    .bind(proposed_solution)
    .bind(target_audience)
    .bind(notes)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single opportunity by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_opportunity(pool: &PgPool, id: i64) -> Result<OpportunityRow, DbError> {
    let row = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Lists opportunities matching the filter, newest-best first by default.
///
/// All filters are optional; a `NULL` bind disables its clause. The total
/// is computed with the same predicates so pagination stays consistent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_opportunities(
    pool: &PgPool,
    filter: &OpportunityFilter,
) -> Result<OpportunityPage, DbError> {
    const PREDICATES: &str = "($1::text IS NULL OR status = $1) \
         AND ($2::text IS NULL OR priority = $2) \
         AND ($3::double precision IS NULL OR overall_score >= $3) \
         AND ($4::boolean IS NULL OR is_starred = $4) \
         AND ($5::text IS NULL OR title ILIKE '%' || $5 || '%' \
              OR problem_statement ILIKE '%' || $5 || '%')";

    let order = sort_column(filter.sort_by.as_deref());
    let direction = if filter.sort_descending { "DESC" } else { "ASC" };

    let items = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
         WHERE {PREDICATES} \
         ORDER BY {order} {direction}, id DESC \
         LIMIT $6 OFFSET $7"
    ))
    .bind(&filter.status)
    .bind(&filter.priority)
    .bind(filter.min_score)
    .bind(filter.is_starred)
    .bind(&filter.search)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM opportunities WHERE {PREDICATES}"
    ))
    .bind(&filter.status)
    .bind(&filter.priority)
    .bind(filter.min_score)
    .bind(filter.is_starred)
    .bind(&filter.search)
    .fetch_one(pool)
    .await?;

    Ok(OpportunityPage {
        items,
        total,
        limit: filter.limit,
        offset: filter.offset,
    })
}

/// Partial update of an opportunity; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct OpportunityUpdate {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub is_starred: Option<bool>,
}

impl OpportunityUpdate {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
            && self.is_starred.is_none()
    }
}

/// Applies a partial update and records the matching reactions in the same
/// transaction.
///
/// Side effects, each recorded only when the value actually changes:
/// a status change appends a `status_change` reaction carrying the old and
/// new status, a star toggle appends `starred` or `unstarred`, and a notes
/// change appends a `note` reaction.
///
/// # Errors
///
/// Returns [`DbError::EmptyUpdate`] if every field is `None`,
/// [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn update_opportunity(
    pool: &PgPool,
    id: i64,
    update: &OpportunityUpdate,
) -> Result<OpportunityRow, DbError> {
    if update.is_empty() {
        return Err(DbError::EmptyUpdate);
    }

    let mut tx = pool.begin().await?;

    let before = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let after = sqlx::query_as::<_, OpportunityRow>(&format!(
        "UPDATE opportunities SET \
             status = COALESCE($1, status), \
             priority = COALESCE($2, priority), \
             notes = COALESCE($3, notes), \
             is_starred = COALESCE($4, is_starred), \
             updated_at = NOW() \
         WHERE id = $5 \
         RETURNING {OPPORTUNITY_COLUMNS}"
    ))
    .bind(&update.status)
    .bind(&update.priority)
    .bind(&update.notes)
    .bind(update.is_starred)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if after.status != before.status {
        record_reaction(
            &mut tx,
            id,
            "status_change",
            &json!({ "from": before.status, "to": after.status }),
        )
        .await?;
    }

    if after.is_starred != before.is_starred {
        let action = if after.is_starred { "starred" } else { "unstarred" };
        record_reaction(&mut tx, id, action, &json!({})).await?;
    }

    if update.notes.is_some() && after.notes != before.notes {
        record_reaction(&mut tx, id, "note", &json!({ "notes": after.notes })).await?;
    }

    tx.commit().await?;

    Ok(after)
}

/// Deletes an opportunity by id. Research and reactions cascade.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_opportunity(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

pub(crate) async fn record_reaction(
    tx: &mut Transaction<'_, Postgres>,
    opportunity_id: i64,
    action_type: &str,
    action_data: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO reactions (opportunity_id, action_type, action_data) VALUES ($1, $2, $3)",
    )
    .bind(opportunity_id)
    .bind(action_type)
    .bind(action_data)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
