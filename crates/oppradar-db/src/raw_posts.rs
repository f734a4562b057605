//! Database operations for the `raw_posts` table.

use chrono::{DateTime, Utc};
use oppradar_core::Classification;
use sqlx::PgPool;

use crate::DbError;

const RAW_POST_COLUMNS: &str = "id, source_id, external_id, title, body, author, url, score, \
     comment_count, posted_at, is_processed, is_opportunity, scraped_at, created_at";

/// A row from the `raw_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawPostRow {
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
    pub is_processed: bool,
    pub is_opportunity: Option<bool>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RawPostRow {
    #[must_use]
    pub fn classification(&self) -> Classification {
        Classification::from_column(self.is_opportunity)
    }
}

/// A normalized item produced by a source transport, ready for upsert.
#[derive(Debug, Clone)]
pub struct NewRawPost {
    pub external_id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub score: i32,
    pub comment_count: i32,
    pub posted_at: Option<DateTime<Utc>>,
    pub classification: Classification,
}

/// Inserts a raw post if the `(source_id, external_id)` pair is unseen.
///
/// Returns `true` if a new row was inserted, `false` if the item was
/// already known. Re-ingestion never overwrites an existing row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn upsert_raw_post(
    pool: &PgPool,
    source_id: i64,
    post: &NewRawPost,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO raw_posts \
             (source_id, external_id, title, body, author, url, score, comment_count, \
              posted_at, is_processed, is_opportunity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, $10) \
         ON CONFLICT (source_id, external_id) DO NOTHING",
    )
    .bind(source_id)
    .bind(&post.external_id)
    .bind(&post.title)
    .bind(&post.body)
    .bind(&post.author)
    .bind(&post.url)
    .bind(post.score)
    .bind(post.comment_count)
    .bind(post.posted_at)
    .bind(post.classification.as_column())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Fetches a single raw post by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_raw_post(pool: &PgPool, id: i64) -> Result<RawPostRow, DbError> {
    let row = sqlx::query_as::<_, RawPostRow>(&format!(
        "SELECT {RAW_POST_COLUMNS} FROM raw_posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns up to `limit` unresolved posts (`is_processed = false AND
/// is_opportunity IS NULL`), ordered by score descending.
///
/// Callers over-fetch a multiple of the batch size so niche reranking can
/// surface boosted posts buried deeper in the popularity order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unresolved_posts(pool: &PgPool, limit: i64) -> Result<Vec<RawPostRow>, DbError> {
    let rows = sqlx::query_as::<_, RawPostRow>(&format!(
        "SELECT {RAW_POST_COLUMNS} FROM raw_posts \
         WHERE is_processed = false AND is_opportunity IS NULL \
         ORDER BY score DESC, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Resolves a post's classification after an analysis attempt.
///
/// Accepts only a terminal verdict; a resolved post always has
/// `is_processed = true` and a non-null `is_opportunity`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_post_resolved(
    pool: &PgPool,
    id: i64,
    confirmed: bool,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE raw_posts SET is_processed = true, is_opportunity = $1 WHERE id = $2",
    )
    .bind(confirmed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
