use super::domain::{Dimension, EvidenceItem};
use crate::text::content_tokens;

/// Judges how favourable an item is for a dimension, on a 0-100 scale.
///
/// Implementations must be deterministic for the same item. Heuristic and
/// model-backed scorers both sit behind this trait so the aggregation math
/// never changes when the scorer does.
pub trait SignalScorer: Send + Sync {
    fn score(&self, item: &EvidenceItem, dimension: Dimension) -> f64;
}

/// Lexicon scorer: starts neutral and moves with favourable/unfavourable terms.
#[derive(Debug, Clone)]
pub struct KeywordSignalScorer {
    baseline: f64,
    positive_step: f64,
    negative_step: f64,
}

impl Default for KeywordSignalScorer {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            positive_step: 8.0,
            negative_step: 12.0,
        }
    }
}

const SHARED_POSITIVE: &[&str] = &[
    "growth", "growing", "increase", "increased", "record", "award", "profitable", "expanding",
    "leader", "retention",
];

const SHARED_NEGATIVE: &[&str] = &[
    "decline", "declined", "layoffs", "lawsuit", "loss", "losses", "churn", "breach", "outage",
    "shutdown",
];

fn lexicon(dimension: Dimension) -> (&'static [&'static str], &'static [&'static str]) {
    match dimension {
        Dimension::Technical => (
            &[
                "kubernetes", "microservices", "automated", "ci", "cd", "terraform", "encryption",
                "scalable", "tests", "coverage", "hsts", "csp", "observability", "api", "sdk",
                "cloud",
            ],
            &[
                "legacy", "monolith", "deprecated", "vulnerability", "vulnerabilities", "manual",
                "unpatched", "missing", "eol",
            ],
        ),
        Dimension::Business => (
            &[
                "recurring", "subscription", "enterprise", "contracts", "partners",
                "marketplace", "upsell", "margin", "margins", "customers",
            ],
            &["concentration", "discounting", "one-off", "dependency", "cancelled"],
        ),
        Dimension::Market => (
            &[
                "tam", "billion", "fragmented", "underserved", "demand", "adoption", "share",
                "category",
            ],
            &["saturated", "commoditized", "crowded", "shrinking", "regulation"],
        ),
        Dimension::Team => (
            &[
                "founder", "experienced", "veteran", "hiring", "engineers", "remote", "tenure",
                "advisors",
            ],
            &["turnover", "departed", "resigned", "vacant", "attrition"],
        ),
        Dimension::Financial => (
            &[
                "arr", "mrr", "revenue", "series", "funding", "raised", "profitable", "runway",
                "valuation",
            ],
            &["debt", "burn", "down-round", "insolvency", "default", "writedown"],
        ),
    }
}

impl SignalScorer for KeywordSignalScorer {
    fn score(&self, item: &EvidenceItem, dimension: Dimension) -> f64 {
        let tokens = content_tokens(&item.text);
        let (positive, negative) = lexicon(dimension);

        let positive_hits = positive
            .iter()
            .chain(SHARED_POSITIVE)
            .filter(|term| tokens.contains(**term))
            .count();
        let negative_hits = negative
            .iter()
            .chain(SHARED_NEGATIVE)
            .filter(|term| tokens.contains(**term))
            .count();

        let score = self.baseline + self.positive_step * positive_hits as f64
            - self.negative_step * negative_hits as f64;
        score.clamp(0.0, 100.0)
    }
}
