//! Database operations for the `scrape_logs` table.
//!
//! Every ingest pass opens one log row per source, then closes it with
//! either counters or an error message. Rows are never deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `scrape_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeLogRow {
    pub id: i64,
    pub source_id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub posts_found: i32,
    pub posts_new: i32,
    pub opportunities_found: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A scrape log joined with its source's platform and display name, for
/// the stats endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeLogWithSource {
    pub id: i64,
    pub source_id: i64,
    pub platform: String,
    pub display_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub posts_found: i32,
    pub posts_new: i32,
    pub opportunities_found: i32,
    pub error_message: Option<String>,
}

/// Opens a scrape log row for a source and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn start_scrape_log(pool: &PgPool, source_id: i64) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO scrape_logs (source_id) VALUES ($1) RETURNING id",
    )
    .bind(source_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Closes a scrape log with final counters.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_scrape_log(
    pool: &PgPool,
    id: i64,
    posts_found: i32,
    posts_new: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_logs SET completed_at = NOW(), posts_found = $1, posts_new = $2 \
         WHERE id = $3",
    )
    .bind(posts_found)
    .bind(posts_new)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Closes a scrape log with an error message.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_scrape_log(pool: &PgPool, id: i64, message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_logs SET completed_at = NOW(), error_message = $1 WHERE id = $2",
    )
    .bind(message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Returns the most recent scrape logs joined with source names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_scrape_logs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ScrapeLogWithSource>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeLogWithSource>(
        "SELECT l.id, l.source_id, s.platform, s.display_name, l.started_at, \
                l.completed_at, l.posts_found, l.posts_new, l.opportunities_found, \
                l.error_message \
         FROM scrape_logs l \
         JOIN sources s ON s.id = l.source_id \
         ORDER BY l.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
