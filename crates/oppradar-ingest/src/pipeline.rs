//! Ingestion pipeline orchestration.
//!
//! One pass walks every active source, skips the ones not yet due,
//! fetches and stores the rest, and records a scrape log per source.
//! A failing source never aborts the pass; its error lands in the scrape
//! log and the outcome list, and the next source still runs.

use std::time::Duration;

use oppradar_core::{AppConfig, SourcePlatform};
use oppradar_db::{
    complete_scrape_log, fail_scrape_log, list_active_sources, start_scrape_log,
    touch_source_scraped, upsert_raw_post, NewRawPost, SourceRow,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::IngestError;
use crate::sources::hackernews::{HnClient, StoryKind};
use crate::sources::{hackernews, reddit_rss};

/// HTTP transports for all source platforms.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: reqwest::Client,
    reddit_base_url: String,
    hn: HnClient,
}

impl IngestClient {
    /// Build the production client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.ingest_user_agent)
            .timeout(Duration::from_secs(config.ingest_request_timeout_secs))
            .build()?;
        Ok(Self::with_base_urls(
            http,
            reddit_rss::DEFAULT_BASE_URL,
            hackernews::DEFAULT_BASE_URL,
        ))
    }

    /// Point both transports at alternate roots (used by tests).
    #[must_use]
    pub fn with_base_urls(
        http: reqwest::Client,
        reddit_base_url: &str,
        hn_base_url: &str,
    ) -> Self {
        Self {
            http: http.clone(),
            reddit_base_url: reddit_base_url.trim_end_matches('/').to_string(),
            hn: HnClient::with_base_url(http, hn_base_url),
        }
    }
}

/// Per-source result of one ingest pass.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    #[serde(flatten)]
    pub result: SourceResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SourceResult {
    Completed { posts_found: i32, posts_new: i32 },
    Skipped { reason: String },
    Failed { error: String },
}

fn is_due(source: &SourceRow) -> bool {
    match source.last_scraped_at {
        None => true,
        Some(last) => {
            let elapsed_secs = (chrono::Utc::now() - last).num_seconds();
            elapsed_secs >= i64::from(source.scrape_frequency_hours) * 3600
        }
    }
}

/// Run one full ingest pass over all active sources.
///
/// # Errors
///
/// Returns [`IngestError::Db`] only if the source listing itself fails;
/// per-source errors are captured in the returned outcomes.
pub async fn run_ingest(
    pool: &PgPool,
    client: &IngestClient,
    config: &AppConfig,
) -> Result<Vec<SourceOutcome>, IngestError> {
    let sources = list_active_sources(pool).await?;
    let mut outcomes = Vec::with_capacity(sources.len());

    for source in sources {
        if !is_due(&source) {
            outcomes.push(SourceOutcome {
                source: source.display_name,
                result: SourceResult::Skipped {
                    reason: "not due yet".to_string(),
                },
            });
            continue;
        }

        if SourcePlatform::parse(&source.platform) == SourcePlatform::Other {
            outcomes.push(SourceOutcome {
                source: source.display_name,
                result: SourceResult::Skipped {
                    reason: format!("platform '{}' not supported", source.platform),
                },
            });
            continue;
        }

        let result = match scrape_source(pool, client, &source, config).await {
            Ok((posts_found, posts_new)) => {
                tracing::info!(
                    source = %source.identifier,
                    posts_found,
                    posts_new,
                    "source scraped"
                );
                SourceResult::Completed {
                    posts_found,
                    posts_new,
                }
            }
            Err(e) => {
                tracing::warn!(source = %source.identifier, error = %e, "source scrape failed");
                SourceResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        outcomes.push(SourceOutcome {
            source: source.display_name,
            result,
        });

        tokio::time::sleep(Duration::from_millis(config.ingest_inter_source_delay_ms)).await;
    }

    Ok(outcomes)
}

/// Scrape one source end to end: open a log, fetch, store, close the log.
/// The log is closed with an error message on any failure, including a
/// failure partway through storing.
async fn scrape_source(
    pool: &PgPool,
    client: &IngestClient,
    source: &SourceRow,
    config: &AppConfig,
) -> Result<(i32, i32), IngestError> {
    let log_id = start_scrape_log(pool, source.id).await?;

    match fetch_and_store(pool, client, source, config).await {
        Ok((posts_found, posts_new)) => {
            complete_scrape_log(pool, log_id, posts_found, posts_new).await?;
            touch_source_scraped(pool, source.id).await?;
            Ok((posts_found, posts_new))
        }
        Err(e) => {
            if let Err(log_error) = fail_scrape_log(pool, log_id, &e.to_string()).await {
                tracing::warn!(
                    source = %source.identifier,
                    error = %log_error,
                    "failed to record scrape error"
                );
            }
            Err(e)
        }
    }
}

async fn fetch_and_store(
    pool: &PgPool,
    client: &IngestClient,
    source: &SourceRow,
    config: &AppConfig,
) -> Result<(i32, i32), IngestError> {
    let posts = fetch_posts(client, source, config).await?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let posts_found = posts.len() as i32;
    let mut posts_new = 0;
    for post in &posts {
        if upsert_raw_post(pool, source.id, post).await? {
            posts_new += 1;
        }
    }

    Ok((posts_found, posts_new))
}

async fn fetch_posts(
    client: &IngestClient,
    source: &SourceRow,
    config: &AppConfig,
) -> Result<Vec<NewRawPost>, IngestError> {
    match SourcePlatform::parse(&source.platform) {
        SourcePlatform::Reddit => {
            reddit_rss::fetch_subreddit_posts(
                &client.http,
                &client.reddit_base_url,
                &source.identifier,
            )
            .await
        }
        SourcePlatform::Hackernews => {
            let kind = StoryKind::parse(&source.identifier)?;
            client
                .hn
                .fetch_stories(kind, config.ingest_hn_item_limit)
                .await
        }
        // Filtered out before dispatch; kept as an error for direct callers.
        SourcePlatform::Other => Err(IngestError::Feed(format!(
            "platform '{}' not supported",
            source.platform
        ))),
    }
}
