//! Database operations for the `sources` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const SOURCE_COLUMNS: &str = "id, platform, identifier, display_name, scrape_frequency_hours, \
     is_active, last_scraped_at, created_at, updated_at";

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
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

/// Fields for creating a source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub platform: String,
    pub identifier: String,
    pub display_name: String,
    pub scrape_frequency_hours: i32,
}

/// Partial update of a source; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SourceUpdate {
    pub display_name: Option<String>,
    pub identifier: Option<String>,
    pub scrape_frequency_hours: Option<i32>,
    pub is_active: Option<bool>,
}

/// Returns all sources, ordered by platform then display name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources ORDER BY platform, display_name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all active sources, ordered by platform then display name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources \
         WHERE is_active = true \
         ORDER BY platform, display_name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single source by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_source(pool: &PgPool, id: i64) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Creates a new source row and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the unique
/// `(platform, identifier)` constraint).
pub async fn create_source(pool: &PgPool, source: &NewSource) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(&format!(
        "INSERT INTO sources (platform, identifier, display_name, scrape_frequency_hours) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {SOURCE_COLUMNS}"
    ))
    .bind(&source.platform)
    .bind(&source.identifier)
    .bind(&source.display_name)
    .bind(source.scrape_frequency_hours)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies a partial update to a source and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_source(
    pool: &PgPool,
    id: i64,
    update: &SourceUpdate,
) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(&format!(
        "UPDATE sources SET \
             display_name = COALESCE($1, display_name), \
             identifier = COALESCE($2, identifier), \
             scrape_frequency_hours = COALESCE($3, scrape_frequency_hours), \
             is_active = COALESCE($4, is_active), \
             updated_at = NOW() \
         WHERE id = $5 \
         RETURNING {SOURCE_COLUMNS}"
    ))
    .bind(&update.display_name)
    .bind(&update.identifier)
    .bind(update.scrape_frequency_hours)
    .bind(update.is_active)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Stamps `last_scraped_at = NOW()` after a successful scrape.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_source_scraped(pool: &PgPool, id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE sources SET last_scraped_at = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
