//! Heuristic signal filter applied at ingest time.
//!
//! A post that matches none of the markers for its source kind is stored
//! already rejected, so the LLM backlog only ever contains plausible
//! candidates. Forum posts and story-board posts use different marker
//! lists; story-board `ask`/`job` listings bypass the filter entirely.

use std::sync::OnceLock;

use regex::{RegexSet, RegexSetBuilder};

const FORUM_PATTERNS: &[&str] = &[
    r"i wish there was",
    r"is there a tool",
    r"is there a way to",
    r"looking for a solution",
    r"anyone know of",
    r"recommendations? for",
    r"how do you handle",
    r"frustrated with",
    r"pain point",
    r"manually doing",
    r"waste.* time",
    r"automate",
    r"i('d| would) pay for",
    r"need a tool",
    r"built a tool",
    r"looking for software",
    r"what do you use for",
    r"better way to",
    r"struggling with",
    r"any alternatives to",
];

const STORY_PATTERNS: &[&str] = &[
    r"ask hn",
    r"looking for",
    r"is there",
    r"anyone (built|know|use)",
    r"recommend",
    r"alternative to",
    r"frustrated",
    r"i wish",
    r"would pay",
    r"need a",
    r"show hn",
    r"built this",
    r"made this",
    r"launching",
    r"feedback",
    r"problem",
    r"solution",
];

fn build_set(patterns: &[&str]) -> RegexSet {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("static signal patterns failed to compile: {e}"))
}

/// Marker set for forum posts (self-text style, explicit tool requests).
pub fn forum_signals() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| build_set(FORUM_PATTERNS))
}

/// Marker set for story-board posts (title-heavy, launch/feedback style).
pub fn story_signals() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| build_set(STORY_PATTERNS))
}

/// Returns `true` if the text matches any marker in the set.
#[must_use]
pub fn has_signal(text: &str, patterns: &RegexSet) -> bool {
    patterns.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forum_markers_match_case_insensitively() {
        let set = forum_signals();
        assert!(has_signal("I WISH THERE WAS a tool for this", set));
        assert!(has_signal("so frustrated with my invoicing setup", set));
        assert!(has_signal("I'd pay for something that just works", set));
        assert!(has_signal("we waste so much time on data entry", set));
    }

    #[test]
    fn forum_markers_reject_plain_chatter() {
        let set = forum_signals();
        assert!(!has_signal("Here is a photo of my cat", set));
        assert!(!has_signal("Weekly open discussion thread", set));
    }

    #[test]
    fn story_markers_cover_launch_language() {
        let set = story_signals();
        assert!(has_signal("Show HN: I made this over the weekend", set));
        assert!(has_signal("Looking for feedback on my side project", set));
        assert!(!has_signal("The history of the telegraph", set));
    }

    #[test]
    fn recommendation_marker_allows_optional_plural() {
        let set = forum_signals();
        assert!(has_signal("recommendation for a crm?", set));
        assert!(has_signal("recommendations for a crm?", set));
    }
}
