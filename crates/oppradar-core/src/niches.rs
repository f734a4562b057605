//! Niche matching and priority boosts.
//!
//! A niche is a named keyword set with a priority level. Posts whose text
//! matches a niche are pulled forward in the analysis queue by the boost
//! multiplier of the highest-priority matching niche. Matching is pure and
//! re-evaluated per run, since the niche list is editable at runtime.

use crate::types::NichePriority;

/// A configured focus area.
#[derive(Debug, Clone)]
pub struct Niche {
    pub name: String,
    pub keywords: Vec<String>,
    pub priority: NichePriority,
    pub is_active: bool,
}

/// Result of matching a text against a niche list.
#[derive(Debug, Clone, Default)]
pub struct NicheMatch {
    pub matched_names: Vec<String>,
    pub highest_priority: Option<NichePriority>,
}

impl NicheMatch {
    #[must_use]
    pub fn matches(&self) -> bool {
        !self.matched_names.is_empty()
    }
}

/// Match a text against the active niches in `niches`.
///
/// A niche matches if ANY of its keywords is a case-insensitive substring
/// of `text`. The highest priority among matching niches wins; priorities
/// are never summed.
#[must_use]
pub fn match_niches(text: &str, niches: &[Niche]) -> NicheMatch {
    let lower = text.to_lowercase();
    let mut result = NicheMatch::default();

    for niche in niches.iter().filter(|n| n.is_active) {
        let hit = niche
            .keywords
            .iter()
            .any(|kw| lower.contains(&kw.to_lowercase()));
        if !hit {
            continue;
        }
        result.matched_names.push(niche.name.clone());
        result.highest_priority = match result.highest_priority {
            Some(current) if current.rank() <= niche.priority.rank() => Some(current),
            _ => Some(niche.priority),
        };
    }

    result
}

/// Boost multiplier applied during analysis-queue reranking.
#[must_use]
pub fn boost(priority: Option<NichePriority>) -> f64 {
    match priority {
        Some(NichePriority::High) => 2.0,
        Some(NichePriority::Medium) => 1.5,
        Some(NichePriority::Low) => 1.2,
        None => 1.0,
    }
}

/// Static fallback niche list, used when the niche table is unreachable or
/// empty.
#[must_use]
pub fn default_niches() -> Vec<Niche> {
    fn niche(name: &str, keywords: &[&str], priority: NichePriority) -> Niche {
        Niche {
            name: name.to_string(),
            keywords: keywords.iter().map(ToString::to_string).collect(),
            priority,
            is_active: true,
        }
    }

    vec![
        niche(
            "AI/Automation",
            &[
                "ai",
                "automation",
                "automate",
                "chatbot",
                "gpt",
                "llm",
                "machine learning",
                "workflow",
            ],
            NichePriority::High,
        ),
        niche(
            "Developer Tools",
            &[
                "developer",
                "api",
                "sdk",
                "devtools",
                "cli",
                "coding",
                "github",
                "deployment",
            ],
            NichePriority::High,
        ),
        niche(
            "Productivity",
            &[
                "productivity",
                "time tracking",
                "task management",
                "calendar",
                "scheduling",
                "notion",
                "workflow",
            ],
            NichePriority::High,
        ),
        niche(
            "E-commerce",
            &[
                "ecommerce",
                "shopify",
                "inventory",
                "dropshipping",
                "amazon",
                "etsy",
                "online store",
            ],
            NichePriority::Medium,
        ),
        niche(
            "Marketing",
            &[
                "marketing",
                "seo",
                "social media",
                "email marketing",
                "analytics",
                "content",
                "leads",
            ],
            NichePriority::Medium,
        ),
        niche(
            "Finance/Accounting",
            &[
                "invoice",
                "accounting",
                "bookkeeping",
                "expense",
                "budget",
                "payment",
                "billing",
            ],
            NichePriority::Medium,
        ),
        niche(
            "HR/Recruiting",
            &[
                "hiring",
                "recruiting",
                "hr",
                "onboarding",
                "payroll",
                "employee",
                "applicant",
            ],
            NichePriority::Low,
        ),
        niche(
            "Healthcare",
            &[
                "healthcare",
                "medical",
                "patient",
                "clinic",
                "telehealth",
                "appointment",
            ],
            NichePriority::Low,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_niches() -> Vec<Niche> {
        vec![
            Niche {
                name: "Invoicing".to_string(),
                keywords: vec!["invoice".to_string(), "billing".to_string()],
                priority: NichePriority::Medium,
                is_active: true,
            },
            Niche {
                name: "DevTools".to_string(),
                keywords: vec!["api".to_string(), "cli".to_string()],
                priority: NichePriority::High,
                is_active: true,
            },
            Niche {
                name: "Dormant".to_string(),
                keywords: vec!["invoice".to_string()],
                priority: NichePriority::High,
                is_active: false,
            },
        ]
    }

    #[test]
    fn no_keywords_in_text_returns_no_match() {
        let m = match_niches("looking for a cooking recipe", &test_niches());
        assert!(!m.matches());
        assert!(m.highest_priority.is_none());
    }

    #[test]
    fn single_keyword_match_is_case_insensitive() {
        let m = match_niches("Frustrated with INVOICE reminders", &test_niches());
        assert!(m.matches());
        assert_eq!(m.matched_names, vec!["Invoicing"]);
        assert_eq!(m.highest_priority, Some(NichePriority::Medium));
    }

    #[test]
    fn highest_priority_wins_across_niches() {
        let m = match_niches("an api for invoice processing", &test_niches());
        assert_eq!(m.matched_names.len(), 2);
        assert_eq!(m.highest_priority, Some(NichePriority::High));
    }

    #[test]
    fn inactive_niches_never_participate() {
        let niches = vec![Niche {
            name: "Dormant".to_string(),
            keywords: vec!["invoice".to_string()],
            priority: NichePriority::High,
            is_active: false,
        }];
        let m = match_niches("invoice tool", &niches);
        assert!(!m.matches());
    }

    #[test]
    fn boost_values_are_strictly_ordered() {
        assert!((boost(None) - 1.0).abs() < f64::EPSILON);
        assert!(boost(Some(NichePriority::High)) > boost(Some(NichePriority::Medium)));
        assert!(boost(Some(NichePriority::Medium)) > boost(Some(NichePriority::Low)));
        assert!(boost(Some(NichePriority::Low)) > boost(None));
    }

    #[test]
    fn default_niches_are_all_active() {
        let niches = default_niches();
        assert!(!niches.is_empty());
        assert!(niches.iter().all(|n| n.is_active && !n.keywords.is_empty()));
    }
}
