//! Provider-agnostic analysis and research generation.
//!
//! Models are asked for bare JSON; replies wrapped in markdown code fences
//! are tolerated by stripping the fences before parsing. Parsing is strict
//! beyond that: a reply missing required fields is an error, not a silent
//! rejection.

use std::time::Duration;

use oppradar_core::{AppConfig, ResearchType};
use oppradar_db::{OpportunityRow, RawPostRow};

use crate::clients::{ClaudeClient, OpenAiClient};
use crate::error::AnalyzeError;
use crate::types::{GeneratedResearch, OpportunityAnalysis, Provider};

/// Front door for all LLM calls. Holds at most one client per provider;
/// calls against an unconfigured provider fail with a typed error instead
/// of a panic.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    claude: Option<ClaudeClient>,
    openai: Option<OpenAiClient>,
}

impl AnalysisClient {
    /// Build clients for every provider that has an API key configured.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalyzeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.analyze_request_timeout_secs))
            .build()?;

        Ok(Self {
            claude: config
                .anthropic_api_key
                .as_deref()
                .map(|key| ClaudeClient::new(http.clone(), key, &config.claude_model)),
            openai: config
                .openai_api_key
                .as_deref()
                .map(|key| OpenAiClient::new(http.clone(), key, &config.openai_model)),
        })
    }

    /// Assemble from pre-built clients (used by tests).
    #[must_use]
    pub fn from_clients(claude: Option<ClaudeClient>, openai: Option<OpenAiClient>) -> Self {
        Self { claude, openai }
    }

    /// Send one prompt to the chosen provider. This is the single place
    /// where provider dispatch happens.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::MissingApiKey`] if the provider is not
    /// configured, or the underlying client error.
    pub async fn generate(&self, provider: Provider, prompt: &str) -> Result<String, AnalyzeError> {
        match provider {
            Provider::Claude => {
                self.claude
                    .as_ref()
                    .ok_or(AnalyzeError::MissingApiKey("claude"))?
                    .generate(prompt)
                    .await
            }
            Provider::Openai => {
                self.openai
                    .as_ref()
                    .ok_or(AnalyzeError::MissingApiKey("openai"))?
                    .generate(prompt)
                    .await
            }
        }
    }

    /// Classify one post.
    ///
    /// `Ok(Some(_))` is a confirmed opportunity, `Ok(None)` is the model's
    /// explicit "not an opportunity" verdict, and `Err(_)` means no verdict
    /// could be obtained (the caller leaves the post untouched).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Parse`] if the reply is not the expected
    /// JSON shape, plus any transport error.
    pub async fn analyze(
        &self,
        post: &RawPostRow,
        provider: Provider,
    ) -> Result<Option<OpportunityAnalysis>, AnalyzeError> {
        let prompt = analysis_prompt(post);
        let reply = self.generate(provider, &prompt).await?;
        parse_analysis(&reply)
    }

    /// Generate one research document for an opportunity.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Parse`] if the reply is not the expected
    /// JSON shape, plus any transport error.
    pub async fn research(
        &self,
        opportunity: &OpportunityRow,
        research_type: ResearchType,
        provider: Provider,
    ) -> Result<GeneratedResearch, AnalyzeError> {
        let prompt = research_prompt(opportunity, research_type);
        let reply = self.generate(provider, &prompt).await?;
        let clean = strip_fences(&reply);
        serde_json::from_str(clean).map_err(|e| AnalyzeError::Parse(e.to_string()))
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence, if present.
pub(crate) fn strip_fences(reply: &str) -> &str {
    let mut clean = reply.trim();
    if let Some(rest) = clean.strip_prefix("```json") {
        clean = rest;
    } else if let Some(rest) = clean.strip_prefix("```") {
        clean = rest;
    }
    if let Some(rest) = clean.strip_suffix("```") {
        clean = rest;
    }
    clean.trim()
}

pub(crate) fn parse_analysis(reply: &str) -> Result<Option<OpportunityAnalysis>, AnalyzeError> {
    let clean = strip_fences(reply);
    let value: serde_json::Value =
        serde_json::from_str(clean).map_err(|e| AnalyzeError::Parse(e.to_string()))?;

    match value.get("is_opportunity").and_then(serde_json::Value::as_bool) {
        Some(false) => Ok(None),
        Some(true) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AnalyzeError::Parse(e.to_string())),
        None => Err(AnalyzeError::Parse(
            "reply has no boolean is_opportunity field".to_string(),
        )),
    }
}

fn analysis_prompt(post: &RawPostRow) -> String {
    let title = post.title.as_deref().unwrap_or("No title");
    let body = post.body.as_deref().unwrap_or("No body");
    let url = post.url.as_deref().unwrap_or("N/A");

    format!(
        r#"You are an expert micro SaaS opportunity analyst. Analyze the following social media post to determine if it represents a viable micro SaaS business opportunity.

## Post Content
Title: {title}
Body: {body}
Platform Score: {score} upvotes/likes
Comments: {comments}
URL: {url}

## Analysis Instructions

First, determine if this post indicates a genuine business pain point that could be solved by a micro SaaS application. Look for:
- Explicit requests for tools or solutions
- Frustrations with existing workflows
- Repetitive manual tasks
- Gaps in existing software
- "I wish there was..." or "Is there a tool..." patterns
- Multiple people agreeing in comments (high engagement)

If this IS a potential opportunity, provide detailed analysis. If NOT, explain why briefly.

## Response Format (JSON only, no markdown)

{{
  "is_opportunity": boolean,
  "title": "Concise opportunity title (if opportunity)",
  "problem_statement": "Clear 1-2 sentence problem description",
  "proposed_solution": "High-level solution concept",
  "target_audience": "Who would pay for this",
  "pain_intensity_score": 1-10 (how painful is this problem?),
  "market_size_score": 1-10 (how many people have this problem?),
  "technical_feasibility_score": 1-10 (how easy to build as micro SaaS?),
  "competition_score": 1-10 (10 = no competition, 1 = saturated market),
  "monetization_potential_score": 1-10 (would people pay? how much?),
  "ai_analysis_summary": "2-3 paragraph analysis of the opportunity",
  "similar_existing_products": ["Product 1", "Product 2"],
  "suggested_mvp_features": ["Feature 1", "Feature 2", "Feature 3"],
  "estimated_build_time": "1-2 weeks" | "1 month" | "2-3 months" | "3+ months",
  "suggested_pricing_model": "Freemium", "Usage-based", "$X/month", etc.,
  "keywords": ["keyword1", "keyword2"],
  "priority": "high" | "medium" | "low"
}}

If not an opportunity, return:
{{
  "is_opportunity": false,
  "reason": "Brief explanation why this isn't an opportunity"
}}

Respond with ONLY valid JSON, no additional text."#,
        score = post.score,
        comments = post.comment_count,
    )
}

fn research_prompt(opportunity: &OpportunityRow, research_type: ResearchType) -> String {
    let problem = &opportunity.problem_statement;
    let solution = opportunity.proposed_solution.as_deref().unwrap_or("N/A");

    let body = match research_type {
        ResearchType::CompetitorAnalysis => format!(
            r"Research existing competitors and alternatives for this micro SaaS opportunity:

Problem: {problem}
Proposed Solution: {solution}

Provide a detailed competitor analysis including:
1. Direct competitors (tools that solve the exact problem)
2. Indirect competitors (workarounds people use)
3. Pricing comparison
4. Feature gaps and opportunities for differentiation
5. Why a new entrant could succeed"
        ),
        ResearchType::MarketSize => format!(
            r"Estimate the market size for this micro SaaS opportunity:

Problem: {problem}
Target Solution: {solution}

Provide:
1. TAM/SAM/SOM estimates with reasoning
2. Growth trends in this space
3. Related market data points
4. Revenue potential at different price points
5. Customer acquisition channels"
        ),
        ResearchType::TechnicalSpike => format!(
            r"Provide a technical architecture overview for building this micro SaaS:

Problem: {problem}
Solution: {solution}

Include:
1. Recommended tech stack
2. Key technical challenges
3. Third-party APIs/services needed
4. MVP scope (what to build first)
5. Estimated development timeline
6. Hosting/infrastructure recommendations"
        ),
    };

    format!(
        r#"{body}

Format your response as JSON:
{{
  "title": "Research title",
  "content": "Detailed markdown-formatted research content",
  "sources": ["Reference 1", "Reference 2"]
}}

Respond with ONLY valid JSON."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIVE_REPLY: &str = r#"{
        "is_opportunity": true,
        "title": "T",
        "problem_statement": "P",
        "pain_intensity_score": 7,
        "market_size_score": 6,
        "technical_feasibility_score": 8,
        "competition_score": 5,
        "monetization_potential_score": 6,
        "priority": "high"
    }"#;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn positive_verdict_parses_fully() {
        let analysis = parse_analysis(POSITIVE_REPLY).expect("parse").expect("some");
        assert_eq!(analysis.title, "T");
        assert_eq!(analysis.priority, "high");
    }

    #[test]
    fn negative_verdict_maps_to_none() {
        let reply = r#"{"is_opportunity": false, "reason": "just a meme"}"#;
        assert!(parse_analysis(reply).expect("parse").is_none());
    }

    #[test]
    fn fenced_negative_verdict_still_parses() {
        let reply = "```json\n{\"is_opportunity\": false, \"reason\": \"n/a\"}\n```";
        assert!(parse_analysis(reply).expect("parse").is_none());
    }

    #[test]
    fn positive_verdict_missing_scores_is_an_error() {
        let reply = r#"{"is_opportunity": true, "title": "T", "problem_statement": "P"}"#;
        assert!(matches!(parse_analysis(reply), Err(AnalyzeError::Parse(_))));
    }

    #[test]
    fn missing_verdict_field_is_an_error() {
        let reply = r#"{"title": "T"}"#;
        assert!(matches!(parse_analysis(reply), Err(AnalyzeError::Parse(_))));
    }

    #[test]
    fn non_json_reply_is_an_error() {
        assert!(matches!(
            parse_analysis("I think this is a great idea!"),
            Err(AnalyzeError::Parse(_))
        ));
    }
}
