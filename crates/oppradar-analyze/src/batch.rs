//! Weighted concurrent batch analysis with provider fallback.
//!
//! Unlike the scheduler's strict alternation, this path splits posts
//! between providers by a configurable weight and retries each failure
//! once on the other provider. Used for operator-driven backfills.

use std::collections::HashMap;
use std::time::Duration;

use oppradar_db::RawPostRow;

use crate::analyzer::AnalysisClient;
use crate::types::{OpportunityAnalysis, Provider};

/// Analyze a batch of posts, splitting load between providers.
///
/// `claude_weight` is the fraction of posts assigned to Claude as their
/// primary provider (0.0 to 1.0), applied over the post's position in the
/// batch. A failed call is retried once on the other provider; if both
/// fail, the post maps to `None` and the caller decides what to do with
/// it. Posts run in chunks of `max_concurrent` with a fixed pause between
/// chunks.
pub async fn analyze_batch_weighted(
    client: &AnalysisClient,
    posts: &[RawPostRow],
    claude_weight: f64,
    max_concurrent: usize,
    inter_chunk_delay: Duration,
) -> HashMap<i64, Option<OpportunityAnalysis>> {
    let mut results = HashMap::with_capacity(posts.len());
    let chunk_size = max_concurrent.max(1);
    let chunk_count = posts.len().div_ceil(chunk_size);

    for (chunk_index, chunk) in posts.chunks(chunk_size).enumerate() {
        let futures = chunk.iter().enumerate().map(|(offset, post)| {
            let primary = assign_provider(chunk_index * chunk_size + offset, claude_weight);
            analyze_with_fallback(client, post, primary)
        });

        for (post_id, analysis) in futures::future::join_all(futures).await {
            results.insert(post_id, analysis);
        }

        if chunk_index + 1 < chunk_count {
            tokio::time::sleep(inter_chunk_delay).await;
        }
    }

    results
}

/// Map a batch position to its primary provider by weight.
fn assign_provider(index: usize, claude_weight: f64) -> Provider {
    #[allow(clippy::cast_precision_loss)]
    let slot = (index % 10) as f64;
    if slot >= claude_weight * 10.0 {
        Provider::Openai
    } else {
        Provider::Claude
    }
}

async fn analyze_with_fallback(
    client: &AnalysisClient,
    post: &RawPostRow,
    primary: Provider,
) -> (i64, Option<OpportunityAnalysis>) {
    match client.analyze(post, primary).await {
        Ok(analysis) => (post.id, analysis),
        Err(e) => {
            let fallback = primary.counterpart();
            tracing::warn!(
                post = post.id,
                provider = primary.as_str(),
                error = %e,
                "analysis failed, retrying on fallback provider"
            );
            match client.analyze(post, fallback).await {
                Ok(analysis) => (post.id, analysis),
                Err(fallback_error) => {
                    tracing::warn!(
                        post = post.id,
                        provider = fallback.as_str(),
                        error = %fallback_error,
                        "fallback provider also failed"
                    );
                    (post.id, None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_weight_splits_half_and_half() {
        let providers: Vec<Provider> = (0..10).map(|i| assign_provider(i, 0.5)).collect();
        let claude = providers.iter().filter(|p| **p == Provider::Claude).count();
        assert_eq!(claude, 5);
        assert_eq!(providers[0], Provider::Claude);
        assert_eq!(providers[5], Provider::Openai);
    }

    #[test]
    fn full_weight_sends_everything_to_claude() {
        assert!((0..20).all(|i| assign_provider(i, 1.0) == Provider::Claude));
        assert!((0..20).all(|i| assign_provider(i, 0.0) == Provider::Openai));
    }
}
