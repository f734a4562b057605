//! Database operations for the `reactions` table.
//!
//! Reactions are an append-only audit trail; most rows are written as
//! side effects of opportunity updates and research generation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `reactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReactionRow {
    pub id: i64,
    pub opportunity_id: i64,
    pub action_type: String,
    pub action_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Appends a reaction outside of any enclosing transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the
/// `action_type` CHECK constraint and the opportunity foreign key).
pub async fn insert_reaction(
    pool: &PgPool,
    opportunity_id: i64,
    action_type: &str,
    action_data: &serde_json::Value,
) -> Result<ReactionRow, DbError> {
    let row = sqlx::query_as::<_, ReactionRow>(
        "INSERT INTO reactions (opportunity_id, action_type, action_data) \
         VALUES ($1, $2, $3) \
         RETURNING id, opportunity_id, action_type, action_data, created_at",
    )
    .bind(opportunity_id)
    .bind(action_type)
    .bind(action_data)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns all reactions for an opportunity, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reactions(
    pool: &PgPool,
    opportunity_id: i64,
) -> Result<Vec<ReactionRow>, DbError> {
    let rows = sqlx::query_as::<_, ReactionRow>(
        "SELECT id, opportunity_id, action_type, action_data, created_at \
         FROM reactions \
         WHERE opportunity_id = $1 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(opportunity_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
