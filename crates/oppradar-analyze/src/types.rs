//! Provider selection and the strict response shapes.

use serde::{Deserialize, Serialize};

/// LLM provider used for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Claude,
    Openai,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Openai => "openai",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::Openai),
            _ => None,
        }
    }

    /// The other provider, used for alternation and fallback.
    #[must_use]
    pub fn counterpart(self) -> Self {
        match self {
            Provider::Claude => Provider::Openai,
            Provider::Openai => Provider::Claude,
        }
    }
}

fn default_priority() -> String {
    "medium".to_string()
}

/// Structured verdict for one post. Field names match the JSON contract in
/// the analysis prompt; missing required fields fail parsing outright.
#[derive(Debug, Clone, Deserialize)]
pub struct OpportunityAnalysis {
    pub is_opportunity: bool,
    pub title: String,
    pub problem_statement: String,
    #[serde(default)]
    pub proposed_solution: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    pub pain_intensity_score: i32,
    pub market_size_score: i32,
    pub technical_feasibility_score: i32,
    pub competition_score: i32,
    pub monetization_potential_score: i32,
    #[serde(default)]
    pub ai_analysis_summary: Option<String>,
    #[serde(default)]
    pub similar_existing_products: Vec<String>,
    #[serde(default)]
    pub suggested_mvp_features: Vec<String>,
    #[serde(default)]
    pub estimated_build_time: Option<String>,
    #[serde(default)]
    pub suggested_pricing_model: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: String,
}

/// A generated research document.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedResearch {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<String>,
}
