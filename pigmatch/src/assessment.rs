//! Keyword triage of sighting notes.
//!
//! Produces a credibility score, tags and a short summary for a freshly reported sighting so
//! hunters can prioritise. The heuristics are deliberately simple and deterministic.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Summary used when the reporter leaves no notes.
pub const DEFAULT_SUMMARY: &str = "Pig sighting reported.";

const SUMMARY_MAX_CHARS: usize = 160;
const BASE_SCORE: f64 = 0.5;

struct Rule {
    tag: &'static str,
    keywords: &'static [&'static str],
    weight: f64,
}

const RULES: &[Rule] = &[
    Rule {
        tag: "fresh",
        keywords: &["fresh", "just now", "right now", "minutes"],
        weight: 0.15,
    },
    Rule {
        tag: "multiple_pigs",
        keywords: &["herd", "group", "many", "8", "10", "dozen"],
        weight: 0.10,
    },
    Rule {
        tag: "property_damage",
        keywords: &["damage", "rooting", "destroyed", "torn up"],
        weight: 0.10,
    },
    Rule {
        tag: "uncertain",
        keywords: &["maybe", "not sure", "think", "guess"],
        weight: -0.15,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assessment {
    /// In `[0, 1]`
    pub credibility_score: f64,
    pub tags: Vec<String>,
    pub summary: String,
}

pub fn assess_notes(notes: Option<&str>) -> Assessment {
    let text = notes.unwrap_or_default().to_lowercase();

    let mut score = BASE_SCORE;
    let mut tags = Vec::new();
    for rule in RULES {
        if rule.keywords.iter().any(|k| text.contains(k)) {
            tags.push(rule.tag.to_string());
            score += rule.weight;
        }
    }

    let summary = match notes {
        Some(n) if !n.is_empty() => n.chars().take(SUMMARY_MAX_CHARS).collect(),
        _ => DEFAULT_SUMMARY.to_string(),
    };

    Assessment {
        credibility_score: score.clamp(0.0, 1.0),
        tags,
        summary,
    }
}
