//! Hacker News Firebase API transport.
//!
//! Each source identifier names a story listing kind (`ask`, `show`,
//! `new`, `top`, `best`, `job`). The listing endpoint returns story ids;
//! items are fetched in concurrent batches. Individual item failures are
//! dropped rather than failing the whole listing.

use chrono::DateTime;
use oppradar_core::Classification;
use oppradar_db::NewRawPost;
use serde::Deserialize;

use crate::error::IngestError;
use crate::signal::{has_signal, story_signals};
use crate::sources::strip_html;

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

const ITEM_BATCH_SIZE: usize = 10;

/// Story listing kind, parsed from a source's identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryKind {
    Ask,
    Show,
    New,
    Top,
    Best,
    Job,
}

impl StoryKind {
    /// # Errors
    ///
    /// Returns [`IngestError::UnknownStoryKind`] for unrecognized
    /// identifiers.
    pub fn parse(identifier: &str) -> Result<Self, IngestError> {
        match identifier {
            "ask" => Ok(StoryKind::Ask),
            "show" => Ok(StoryKind::Show),
            "new" => Ok(StoryKind::New),
            "top" => Ok(StoryKind::Top),
            "best" => Ok(StoryKind::Best),
            "job" => Ok(StoryKind::Job),
            other => Err(IngestError::UnknownStoryKind(other.to_string())),
        }
    }

    fn listing_path(self) -> &'static str {
        match self {
            StoryKind::Ask => "askstories.json",
            StoryKind::Show => "showstories.json",
            StoryKind::New => "newstories.json",
            StoryKind::Top => "topstories.json",
            StoryKind::Best => "beststories.json",
            StoryKind::Job => "jobstories.json",
        }
    }

    /// Ask and job listings are inherently requests/offers, so they skip
    /// the marker filter and always enter the analysis backlog.
    fn bypasses_filter(self) -> bool {
        matches!(self, StoryKind::Ask | StoryKind::Job)
    }
}

#[derive(Debug, Deserialize)]
struct HnItem {
    id: i64,
    title: Option<String>,
    text: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    url: Option<String>,
    #[serde(default)]
    score: i32,
    #[serde(default)]
    descendants: i32,
}

/// Typed Hacker News API client.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: String,
}

impl HnClient {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root (used by tests).
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch up to `limit` stories from a listing and normalize them.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the listing request fails. Item
    /// requests that fail are logged and skipped.
    pub async fn fetch_stories(
        &self,
        kind: StoryKind,
        limit: usize,
    ) -> Result<Vec<NewRawPost>, IngestError> {
        let url = format!("{}/{}", self.base_url, kind.listing_path());
        let mut ids: Vec<i64> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ids.truncate(limit);

        let mut posts = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ITEM_BATCH_SIZE) {
            let fetched =
                futures::future::join_all(batch.iter().map(|&id| self.fetch_item(id))).await;
            for item in fetched.into_iter().flatten() {
                posts.push(to_raw_post(&item, kind));
            }
        }

        Ok(posts)
    }

    async fn fetch_item(&self, id: i64) -> Option<HnItem> {
        let url = format!("{}/item/{id}.json", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response.json::<Option<HnItem>>().await.unwrap_or_else(|e| {
                    tracing::debug!(item = id, error = %e, "item body unreadable, skipping");
                    None
                }),
                Err(e) => {
                    tracing::debug!(item = id, error = %e, "item fetch rejected, skipping");
                    None
                }
            },
            Err(e) => {
                tracing::debug!(item = id, error = %e, "item fetch failed, skipping");
                None
            }
        }
    }
}

fn to_raw_post(item: &HnItem, kind: StoryKind) -> NewRawPost {
    let title = item.title.clone().unwrap_or_default();
    let body = item.text.as_deref().map(strip_html).unwrap_or_default();
    let url = item
        .url
        .clone()
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", item.id));
    let posted_at = item.time.and_then(|t| DateTime::from_timestamp(t, 0));

    let relevant =
        kind.bypasses_filter() || has_signal(&format!("{title} {body}"), story_signals());
    let classification = if relevant {
        Classification::Pending
    } else {
        Classification::Rejected
    };

    NewRawPost {
        external_id: item.id.to_string(),
        title: Some(title),
        body: Some(body),
        author: item.by.clone(),
        url: Some(url),
        score: item.score,
        comment_count: item.descendants,
        posted_at,
        classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, title: &str, text: Option<&str>) -> HnItem {
        HnItem {
            id,
            title: Some(title.to_string()),
            text: text.map(str::to_string),
            by: Some("pg".to_string()),
            time: Some(1_723_291_800),
            url: None,
            score: 12,
            descendants: 4,
        }
    }

    #[test]
    fn ask_and_job_kinds_bypass_the_filter() {
        let post = to_raw_post(&item(1, "Anything at all", None), StoryKind::Ask);
        assert_eq!(post.classification, Classification::Pending);

        let post = to_raw_post(&item(2, "Anything at all", None), StoryKind::Job);
        assert_eq!(post.classification, Classification::Pending);
    }

    #[test]
    fn other_kinds_go_through_the_story_filter() {
        let matching = to_raw_post(
            &item(3, "Looking for a self-hosted analytics tool", None),
            StoryKind::Top,
        );
        assert_eq!(matching.classification, Classification::Pending);

        let miss = to_raw_post(&item(4, "A tour of medieval bridges", None), StoryKind::Top);
        assert_eq!(miss.classification, Classification::Rejected);
    }

    #[test]
    fn missing_url_falls_back_to_discussion_link() {
        let post = to_raw_post(&item(42, "Ask HN: anything", None), StoryKind::Ask);
        assert_eq!(
            post.url.as_deref(),
            Some("https://news.ycombinator.com/item?id=42")
        );
        assert_eq!(post.score, 12);
        assert_eq!(post.comment_count, 4);
        assert!(post.posted_at.is_some());
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        assert!(matches!(
            StoryKind::parse("front"),
            Err(IngestError::UnknownStoryKind(_))
        ));
        assert_eq!(StoryKind::parse("ask").ok(), Some(StoryKind::Ask));
    }
}
