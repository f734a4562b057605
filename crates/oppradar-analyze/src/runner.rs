//! The scheduled analysis batch: niche-boosted selection, strict provider
//! alternation, and post resolution.

use std::time::Duration;

use oppradar_core::{boost, default_niches, match_niches, AppConfig, Niche, NichePriority};
use oppradar_db::{
    insert_opportunity_from_analysis, list_unresolved_posts, mark_post_resolved,
    NewAnalyzedOpportunity, RawPostRow,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::analyzer::AnalysisClient;
use crate::error::AnalyzeError;
use crate::types::{OpportunityAnalysis, Provider};

/// Outcome of one analysis batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisRunSummary {
    pub processed: usize,
    pub opportunities_found: usize,
    pub niche_matched: usize,
    pub errors: usize,
    pub details: Vec<AnalysisDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisDetail {
    pub post_id: i64,
    #[serde(flatten)]
    pub status: AnalysisStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AnalysisStatus {
    OpportunityCreated { opportunity_id: i64 },
    NotAnOpportunity,
    Error,
}

/// Load the active niches, falling back to the static defaults when the
/// table is empty or unreadable. An analysis batch never fails because
/// niche configuration is missing.
pub async fn load_niches(pool: &PgPool) -> Vec<Niche> {
    match oppradar_db::list_active_niches(pool).await {
        Ok(rows) if !rows.is_empty() => rows
            .into_iter()
            .map(oppradar_db::NicheRow::into_niche)
            .collect(),
        Ok(_) => default_niches(),
        Err(e) => {
            tracing::warn!(error = %e, "niche query failed, using default niches");
            default_niches()
        }
    }
}

struct RankedPost {
    post: RawPostRow,
    boost: f64,
    matched: bool,
}

/// Over-fetch the backlog, boost by niche match, and keep the top `limit`
/// posts ordered by `(boost DESC, score DESC)`.
fn rank_posts(posts: Vec<RawPostRow>, niches: &[Niche], limit: usize) -> Vec<RankedPost> {
    let mut ranked: Vec<RankedPost> = posts
        .into_iter()
        .map(|post| {
            let text = format!(
                "{} {}",
                post.title.as_deref().unwrap_or(""),
                post.body.as_deref().unwrap_or("")
            );
            let m = match_niches(&text, niches);
            RankedPost {
                boost: boost(m.highest_priority),
                matched: m.matches(),
                post,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.boost
            .total_cmp(&a.boost)
            .then_with(|| b.post.score.cmp(&a.post.score))
    });
    ranked.truncate(limit);
    ranked
}

/// Run one analysis batch.
///
/// Posts alternate strictly between `provider` (even positions) and its
/// counterpart (odd positions), regardless of per-post outcomes. A post
/// with a verdict is resolved; a post whose analysis errors keeps its
/// flags untouched so the next batch retries it.
///
/// # Errors
///
/// Returns [`AnalyzeError::Db`] only if the backlog query fails;
/// per-post errors are counted in the summary.
pub async fn run_analysis_batch(
    pool: &PgPool,
    client: &AnalysisClient,
    config: &AppConfig,
    limit: i64,
    provider: Provider,
) -> Result<AnalysisRunSummary, AnalyzeError> {
    let niches = load_niches(pool).await;

    let overfetch = limit.saturating_mul(config.analyze_overfetch_factor);
    let backlog = list_unresolved_posts(pool, overfetch).await?;
    let selected = rank_posts(
        backlog,
        &niches,
        usize::try_from(limit).unwrap_or_default(),
    );

    let mut summary = AnalysisRunSummary {
        niche_matched: selected.iter().filter(|r| r.matched).count(),
        ..AnalysisRunSummary::default()
    };

    for (position, ranked) in selected.iter().enumerate() {
        let current = if position % 2 == 0 {
            provider
        } else {
            provider.counterpart()
        };

        let status = analyze_one(pool, client, &ranked.post, current).await;
        match &status {
            AnalysisStatus::OpportunityCreated { .. } => {
                summary.processed += 1;
                summary.opportunities_found += 1;
            }
            AnalysisStatus::NotAnOpportunity => summary.processed += 1,
            AnalysisStatus::Error => summary.errors += 1,
        }
        summary.details.push(AnalysisDetail {
            post_id: ranked.post.id,
            status,
        });

        tokio::time::sleep(Duration::from_millis(config.analyze_inter_call_delay_ms)).await;
    }

    tracing::info!(
        processed = summary.processed,
        opportunities_found = summary.opportunities_found,
        niche_matched = summary.niche_matched,
        errors = summary.errors,
        "analysis batch finished"
    );

    Ok(summary)
}

async fn analyze_one(
    pool: &PgPool,
    client: &AnalysisClient,
    post: &RawPostRow,
    provider: Provider,
) -> AnalysisStatus {
    match client.analyze(post, provider).await {
        Ok(Some(analysis)) => match store_opportunity(pool, post, &analysis).await {
            Ok(opportunity_id) => AnalysisStatus::OpportunityCreated { opportunity_id },
            Err(e) => {
                tracing::warn!(post = post.id, error = %e, "failed to store opportunity");
                AnalysisStatus::Error
            }
        },
        Ok(None) => {
            if let Err(e) = mark_post_resolved(pool, post.id, false).await {
                tracing::warn!(post = post.id, error = %e, "failed to resolve post");
                return AnalysisStatus::Error;
            }
            AnalysisStatus::NotAnOpportunity
        }
        Err(e) => {
            tracing::warn!(
                post = post.id,
                provider = provider.as_str(),
                error = %e,
                "analysis failed, post left for the next batch"
            );
            AnalysisStatus::Error
        }
    }
}

async fn store_opportunity(
    pool: &PgPool,
    post: &RawPostRow,
    analysis: &OpportunityAnalysis,
) -> Result<i64, AnalyzeError> {
    // Unknown priority spellings from the model collapse to medium rather
    // than tripping the column constraint.
    let priority = NichePriority::parse(&analysis.priority)
        .unwrap_or(NichePriority::Medium)
        .as_str()
        .to_string();

    let row = insert_opportunity_from_analysis(
        pool,
        &NewAnalyzedOpportunity {
            raw_post_id: post.id,
            title: analysis.title.clone(),
            problem_statement: analysis.problem_statement.clone(),
            proposed_solution: analysis.proposed_solution.clone(),
            target_audience: analysis.target_audience.clone(),
            pain_intensity_score: analysis.pain_intensity_score,
            market_size_score: analysis.market_size_score,
            technical_feasibility_score: analysis.technical_feasibility_score,
            competition_score: analysis.competition_score,
            monetization_potential_score: analysis.monetization_potential_score,
            ai_analysis_summary: analysis.ai_analysis_summary.clone(),
            similar_existing_products: analysis.similar_existing_products.clone(),
            suggested_mvp_features: analysis.suggested_mvp_features.clone(),
            estimated_build_time: analysis.estimated_build_time.clone(),
            suggested_pricing_model: analysis.suggested_pricing_model.clone(),
            keywords: analysis.keywords.clone(),
            priority,
        },
    )
    .await?;

    mark_post_resolved(pool, post.id, true).await?;

    Ok(row.id)
}
