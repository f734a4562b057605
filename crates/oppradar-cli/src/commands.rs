//! Command handlers for the CLI.
//!
//! These are called from `main` after the database pool and config are
//! established. Per-source failures during ingest are logged and skipped
//! rather than propagated so a single bad source does not abort the run.

use oppradar_analyze::Provider;

pub(crate) async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &oppradar_core::AppConfig,
) -> anyhow::Result<()> {
    let client = oppradar_ingest::IngestClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build ingest client: {e}"))?;

    let outcomes = oppradar_ingest::run_ingest(pool, &client, config).await?;
    if outcomes.is_empty() {
        println!("no active sources configured");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

pub(crate) async fn run_analyze(
    pool: &sqlx::PgPool,
    config: &oppradar_core::AppConfig,
    limit: Option<i64>,
    provider: &str,
) -> anyhow::Result<()> {
    let provider =
        Provider::parse(provider).ok_or_else(|| anyhow::anyhow!("unknown provider '{provider}'"))?;
    let limit = limit.unwrap_or(config.analyze_default_limit).clamp(1, 200);

    let client = oppradar_analyze::AnalysisClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build analysis client: {e}"))?;

    let summary = oppradar_analyze::run_analysis_batch(pool, &client, config, limit, provider).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub(crate) async fn print_stats(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let stats = oppradar_db::collect_stats(pool).await?;

    println!(
        "opportunities: {} total, {} new, {} starred",
        stats.total_opportunities, stats.new_opportunities, stats.starred_opportunities
    );
    match stats.average_overall_score {
        Some(avg) => println!("average overall score: {avg:.2}"),
        None => println!("average overall score: n/a"),
    }

    println!("by status:");
    for row in &stats.by_status {
        println!("  {:<12} {}", row.label, row.count);
    }
    println!("by priority:");
    for row in &stats.by_priority {
        println!("  {:<12} {}", row.label, row.count);
    }

    println!(
        "raw posts: {} total, {} awaiting analysis",
        stats.raw_posts_total, stats.raw_posts_unresolved
    );

    if !stats.recent_scrape_logs.is_empty() {
        println!("recent scrapes:");
        for log in &stats.recent_scrape_logs {
            let status = match (&log.completed_at, &log.error_message) {
                (_, Some(msg)) => format!("failed: {msg}"),
                (Some(_), None) => format!("{} found / {} new", log.posts_found, log.posts_new),
                (None, None) => "running".to_string(),
            };
            println!("  {:<24} {}", log.display_name, status);
        }
    }

    Ok(())
}
