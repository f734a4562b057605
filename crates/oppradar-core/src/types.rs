//! Domain enums shared across the workspace.
//!
//! Database columns store these as lowercase text; the `as_str`/`parse`
//! pairs below are the single source of truth for the wire and column
//! spellings.

use serde::{Deserialize, Serialize};

/// Platform a content source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePlatform {
    Reddit,
    Hackernews,
    Other,
}

impl SourcePlatform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourcePlatform::Reddit => "reddit",
            SourcePlatform::Hackernews => "hackernews",
            SourcePlatform::Other => "other",
        }
    }

    /// Parse a stored platform string. Unknown values map to `Other` so a
    /// row added by a newer deployment never breaks ingestion of the rest.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "reddit" => SourcePlatform::Reddit,
            "hackernews" => SourcePlatform::Hackernews,
            _ => SourcePlatform::Other,
        }
    }
}

/// Workflow status of an opportunity.
///
/// Any state is reachable from any other via explicit update; the only
/// automatic transition is `New -> Researching` on first research
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    New,
    Reviewing,
    Researching,
    Validated,
    Building,
    Rejected,
    Archived,
}

impl OpportunityStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityStatus::New => "new",
            OpportunityStatus::Reviewing => "reviewing",
            OpportunityStatus::Researching => "researching",
            OpportunityStatus::Validated => "validated",
            OpportunityStatus::Building => "building",
            OpportunityStatus::Rejected => "rejected",
            OpportunityStatus::Archived => "archived",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(OpportunityStatus::New),
            "reviewing" => Some(OpportunityStatus::Reviewing),
            "researching" => Some(OpportunityStatus::Researching),
            "validated" => Some(OpportunityStatus::Validated),
            "building" => Some(OpportunityStatus::Building),
            "rejected" => Some(OpportunityStatus::Rejected),
            "archived" => Some(OpportunityStatus::Archived),
            _ => None,
        }
    }
}

/// Priority level used by both niches and opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NichePriority {
    High,
    Medium,
    Low,
}

impl NichePriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NichePriority::High => "high",
            NichePriority::Medium => "medium",
            NichePriority::Low => "low",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(NichePriority::High),
            "medium" => Some(NichePriority::Medium),
            "low" => Some(NichePriority::Low),
            _ => None,
        }
    }

    /// Total order for boost resolution: lower rank wins.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            NichePriority::High => 0,
            NichePriority::Medium => 1,
            NichePriority::Low => 2,
        }
    }
}

/// Tri-state opportunity classification of a raw post.
///
/// Stored as a nullable boolean column; represented as a tagged enum so
/// "processed but still pending" is unrepresentable in code paths that
/// resolve a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Awaiting an LLM verdict.
    Pending,
    /// Confirmed opportunity.
    Confirmed,
    /// Confirmed non-opportunity (filter miss or LLM rejection).
    Rejected,
}

impl Classification {
    #[must_use]
    pub fn from_column(is_opportunity: Option<bool>) -> Self {
        match is_opportunity {
            None => Classification::Pending,
            Some(true) => Classification::Confirmed,
            Some(false) => Classification::Rejected,
        }
    }

    #[must_use]
    pub fn as_column(self) -> Option<bool> {
        match self {
            Classification::Pending => None,
            Classification::Confirmed => Some(true),
            Classification::Rejected => Some(false),
        }
    }
}

/// Kind of LLM-generated research attached to an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchType {
    CompetitorAnalysis,
    MarketSize,
    TechnicalSpike,
}

impl ResearchType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResearchType::CompetitorAnalysis => "competitor_analysis",
            ResearchType::MarketSize => "market_size",
            ResearchType::TechnicalSpike => "technical_spike",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "competitor_analysis" => Some(ResearchType::CompetitorAnalysis),
            "market_size" => Some(ResearchType::MarketSize),
            "technical_spike" => Some(ResearchType::TechnicalSpike),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_known_values() {
        for p in [
            SourcePlatform::Reddit,
            SourcePlatform::Hackernews,
            SourcePlatform::Other,
        ] {
            assert_eq!(SourcePlatform::parse(p.as_str()), p);
        }
    }

    #[test]
    fn platform_unknown_maps_to_other() {
        assert_eq!(SourcePlatform::parse("producthunt"), SourcePlatform::Other);
    }

    #[test]
    fn status_round_trips_all_states() {
        for s in [
            OpportunityStatus::New,
            OpportunityStatus::Reviewing,
            OpportunityStatus::Researching,
            OpportunityStatus::Validated,
            OpportunityStatus::Building,
            OpportunityStatus::Rejected,
            OpportunityStatus::Archived,
        ] {
            assert_eq!(OpportunityStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OpportunityStatus::parse("done"), None);
    }

    #[test]
    fn classification_maps_nullable_boolean() {
        assert_eq!(Classification::from_column(None), Classification::Pending);
        assert_eq!(
            Classification::from_column(Some(true)),
            Classification::Confirmed
        );
        assert_eq!(
            Classification::from_column(Some(false)),
            Classification::Rejected
        );
        assert_eq!(Classification::Pending.as_column(), None);
        assert_eq!(Classification::Confirmed.as_column(), Some(true));
        assert_eq!(Classification::Rejected.as_column(), Some(false));
    }

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(NichePriority::High.rank() < NichePriority::Medium.rank());
        assert!(NichePriority::Medium.rank() < NichePriority::Low.rank());
    }

    #[test]
    fn research_type_round_trips() {
        for t in [
            ResearchType::CompetitorAnalysis,
            ResearchType::MarketSize,
            ResearchType::TechnicalSpike,
        ] {
            assert_eq!(ResearchType::parse(t.as_str()), Some(t));
        }
    }
}
