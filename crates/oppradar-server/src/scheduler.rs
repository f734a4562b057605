//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring ingest and analysis jobs.

use std::sync::Arc;

use oppradar_analyze::{AnalysisClient, Provider};
use oppradar_ingest::IngestClient;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<oppradar_core::AppConfig>,
    ingest: IngestClient,
    analysis: AnalysisClient,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ingest_job(&scheduler, pool.clone(), Arc::clone(&config), ingest).await?;
    register_analyze_job(&scheduler, pool, config, analysis).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the hourly ingest job (top of every hour).
///
/// Due checks inside the run respect each source's scrape frequency, so
/// an hourly tick never scrapes a source more often than configured.
async fn register_ingest_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<oppradar_core::AppConfig>,
    client: IngestClient,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let client = client.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting ingest pass");
            match oppradar_ingest::run_ingest(&pool, &client, &config).await {
                Ok(outcomes) => {
                    tracing::info!(sources = outcomes.len(), "scheduler: ingest pass complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: ingest pass failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the hourly analysis job (half past every hour), offset from
/// ingest so a batch sees the posts the preceding pass stored.
async fn register_analyze_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<oppradar_core::AppConfig>,
    client: AnalysisClient,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 30 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let client = client.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting analysis batch");
            let limit = config.analyze_default_limit;
            match oppradar_analyze::run_analysis_batch(
                &pool,
                &client,
                &config,
                limit,
                Provider::Claude,
            )
            .await
            {
                Ok(summary) => {
                    tracing::info!(
                        processed = summary.processed,
                        opportunities_found = summary.opportunities_found,
                        errors = summary.errors,
                        "scheduler: analysis batch complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: analysis batch failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
