//! Database operations for the `niches` table.

use chrono::{DateTime, Utc};
use oppradar_core::{Niche, NichePriority};
use sqlx::PgPool;

use crate::DbError;

const NICHE_COLUMNS: &str =
    "id, name, keywords, priority, description, is_active, created_at, updated_at";

/// A row from the `niches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NicheRow {
    pub id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub priority: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NicheRow {
    /// Converts the row into the matcher's niche value. Unknown priority
    /// text falls back to low; the CHECK constraint makes that unreachable
    /// in practice.
    #[must_use]
    pub fn into_niche(self) -> Niche {
        let priority = NichePriority::parse(&self.priority).unwrap_or(NichePriority::Low);
        Niche {
            name: self.name,
            keywords: self.keywords,
            priority,
            is_active: self.is_active,
        }
    }
}

/// Fields for creating a niche.
#[derive(Debug, Clone)]
pub struct NewNiche {
    pub name: String,
    pub keywords: Vec<String>,
    pub priority: String,
    pub description: Option<String>,
}

/// Partial update of a niche; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct NicheUpdate {
    pub name: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub priority: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Returns all niches, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_niches(pool: &PgPool) -> Result<Vec<NicheRow>, DbError> {
    let rows = sqlx::query_as::<_, NicheRow>(&format!(
        "SELECT {NICHE_COLUMNS} FROM niches ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all active niches, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_niches(pool: &PgPool) -> Result<Vec<NicheRow>, DbError> {
    let rows = sqlx::query_as::<_, NicheRow>(&format!(
        "SELECT {NICHE_COLUMNS} FROM niches WHERE is_active = true ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single niche by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_niche(pool: &PgPool, id: i64) -> Result<NicheRow, DbError> {
    let row = sqlx::query_as::<_, NicheRow>(&format!(
        "SELECT {NICHE_COLUMNS} FROM niches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Creates a new niche row and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the unique
/// name constraint).
pub async fn create_niche(pool: &PgPool, niche: &NewNiche) -> Result<NicheRow, DbError> {
    let row = sqlx::query_as::<_, NicheRow>(&format!(
        "INSERT INTO niches (name, keywords, priority, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {NICHE_COLUMNS}"
    ))
    .bind(&niche.name)
    .bind(&niche.keywords)
    .bind(&niche.priority)
    .bind(&niche.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies a partial update to a niche and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_niche(
    pool: &PgPool,
    id: i64,
    update: &NicheUpdate,
) -> Result<NicheRow, DbError> {
    let row = sqlx::query_as::<_, NicheRow>(&format!(
        "UPDATE niches SET \
             name = COALESCE($1, name), \
             keywords = COALESCE($2, keywords), \
             priority = COALESCE($3, priority), \
             description = COALESCE($4, description), \
             is_active = COALESCE($5, is_active), \
             updated_at = NOW() \
         WHERE id = $6 \
         RETURNING {NICHE_COLUMNS}"
    ))
    .bind(&update.name)
    .bind(&update.keywords)
    .bind(&update.priority)
    .bind(&update.description)
    .bind(update.is_active)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Deletes a niche by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_niche(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM niches WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
