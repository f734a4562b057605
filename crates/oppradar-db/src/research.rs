//! Database operations for the `research` table.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;

use crate::{opportunities::record_reaction, DbError};

const RESEARCH_COLUMNS: &str =
    "id, opportunity_id, research_type, title, content, sources, ai_generated, created_at";

/// A row from the `research` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResearchRow {
    pub id: i64,
    pub opportunity_id: i64,
    pub research_type: String,
    pub title: String,
    pub content: String,
    pub sources: Vec<String>,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for attaching a research document to an opportunity.
#[derive(Debug, Clone)]
pub struct NewResearch {
    pub research_type: String,
    pub title: String,
    pub content: String,
    pub sources: Vec<String>,
    pub ai_generated: bool,
}

/// Attaches research to an opportunity.
///
/// Runs in one transaction: inserts the document, appends a
/// `research_added` reaction, and moves the opportunity from `new` to
/// `researching` if this is its first research.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the opportunity does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn insert_research(
    pool: &PgPool,
    opportunity_id: i64,
    research: &NewResearch,
) -> Result<ResearchRow, DbError> {
    let mut tx = pool.begin().await?;

    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM opportunities WHERE id = $1 FOR UPDATE",
    )
    .bind(opportunity_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let row = sqlx::query_as::<_, ResearchRow>(&format!(
        "INSERT INTO research (opportunity_id, research_type, title, content, sources, \
                               ai_generated) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {RESEARCH_COLUMNS}"
    ))
    .bind(opportunity_id)
    .bind(&research.research_type)
    .bind(&research.title)
    .bind(&research.content)
    .bind(&research.sources)
    .bind(research.ai_generated)
    .fetch_one(&mut *tx)
    .await?;

    record_reaction(
        &mut tx,
        opportunity_id,
        "research_added",
        &json!({ "research_id": row.id, "research_type": row.research_type }),
    )
    .await?;

    if status == "new" {
        sqlx::query(
            "UPDATE opportunities SET status = 'researching', updated_at = NOW() WHERE id = $1",
        )
        .bind(opportunity_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(row)
}

/// Returns all research for an opportunity, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_research(
    pool: &PgPool,
    opportunity_id: i64,
) -> Result<Vec<ResearchRow>, DbError> {
    let rows = sqlx::query_as::<_, ResearchRow>(&format!(
        "SELECT {RESEARCH_COLUMNS} FROM research \
         WHERE opportunity_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(opportunity_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
