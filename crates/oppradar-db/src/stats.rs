//! Aggregate statistics for the dashboard endpoint and the CLI.

use sqlx::PgPool;

use crate::{scrape_logs::list_recent_scrape_logs, DbError, ScrapeLogWithSource};

const RECENT_SCRAPE_LOG_LIMIT: i64 = 10;

/// One bucket of a grouped count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BreakdownRow {
    pub label: String,
    pub count: i64,
}

/// Snapshot of pipeline and review state.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub total_opportunities: i64,
    pub new_opportunities: i64,
    pub starred_opportunities: i64,
    pub average_overall_score: Option<f64>,
    pub by_status: Vec<BreakdownRow>,
    pub by_priority: Vec<BreakdownRow>,
    pub raw_posts_total: i64,
    pub raw_posts_unresolved: i64,
    pub recent_scrape_logs: Vec<ScrapeLogWithSource>,
}

/// Collects the full stats snapshot.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn collect_stats(pool: &PgPool) -> Result<StatsSummary, DbError> {
    let (total_opportunities, new_opportunities, starred_opportunities, average_overall_score) =
        sqlx::query_as::<_, (i64, i64, i64, Option<f64>)>(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'new'), \
                    COUNT(*) FILTER (WHERE is_starred), \
                    AVG(overall_score) \
             FROM opportunities",
        )
        .fetch_one(pool)
        .await?;

    let by_status = sqlx::query_as::<_, BreakdownRow>(
        "SELECT status AS label, COUNT(*) AS count \
         FROM opportunities GROUP BY status ORDER BY count DESC, label",
    )
    .fetch_all(pool)
    .await?;

    let by_priority = sqlx::query_as::<_, BreakdownRow>(
        "SELECT priority AS label, COUNT(*) AS count \
         FROM opportunities GROUP BY priority ORDER BY count DESC, label",
    )
    .fetch_all(pool)
    .await?;

    let (raw_posts_total, raw_posts_unresolved) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), \
                COUNT(*) FILTER (WHERE is_processed = false AND is_opportunity IS NULL) \
         FROM raw_posts",
    )
    .fetch_one(pool)
    .await?;

    let recent_scrape_logs = list_recent_scrape_logs(pool, RECENT_SCRAPE_LOG_LIMIT).await?;

    Ok(StatsSummary {
        total_opportunities,
        new_opportunities,
        starred_opportunities,
        average_overall_score,
        by_status,
        by_priority,
        raw_posts_total,
        raw_posts_unresolved,
        recent_scrape_logs,
    })
}
