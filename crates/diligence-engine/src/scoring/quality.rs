use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::config::ScoringConfig;
use super::domain::{EvidenceItem, QualityBreakdown};
use crate::text::{content_tokens, jaccard, source_host};

const GENERIC_PHRASES: &[&str] = &[
    "leading",
    "innovative",
    "world-class",
    "best-in-class",
    "cutting-edge",
    "next-generation",
    "industry-leading",
    "seamless",
    "revolutionary",
    "robust",
];

fn quantity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(\$\s?\d[\d,.]*\s*[kmb]?|\d[\d,.]*\s*(%|percent|million|billion|k\b|m\b|users|customers|companies|employees|engineers|requests|ms\b))",
        )
        .expect("quantity pattern compiles")
    })
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b((19|20)\d{2}|q[1-4]|january|february|march|april|may|june|july|august|september|october|november|december)\b",
        )
        .expect("date pattern compiles")
    })
}

fn named_entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[a-z,;:]\s+([A-Z][A-Za-z0-9]+|[A-Z]{2,})")
            .expect("named entity pattern compiles")
    })
}

/// Scores a batch of evidence; corroboration needs the whole batch in view.
pub struct QualityScorer<'a> {
    config: &'a ScoringConfig,
    keywords: &'a BTreeSet<String>,
    as_of: DateTime<Utc>,
}

impl<'a> QualityScorer<'a> {
    pub fn new(
        config: &'a ScoringConfig,
        keywords: &'a BTreeSet<String>,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            keywords,
            as_of,
        }
    }

    /// Returns one breakdown per item, in input order.
    pub fn score_batch(&self, items: &[EvidenceItem]) -> Vec<QualityBreakdown> {
        let profiles: Vec<ItemProfile> = items.iter().map(ItemProfile::new).collect();

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                if item.text.trim().is_empty() {
                    return QualityBreakdown::default();
                }
                let corroborations = profiles
                    .iter()
                    .enumerate()
                    .filter(|(other_idx, other)| {
                        *other_idx != idx
                            && profiles[idx].corroborated_by(other, self.config.corroboration_overlap)
                    })
                    .count();
                self.breakdown(item, &profiles[idx], corroborations)
            })
            .collect()
    }

    fn breakdown(
        &self,
        item: &EvidenceItem,
        profile: &ItemProfile,
        corroborations: usize,
    ) -> QualityBreakdown {
        let weights = &self.config.quality;
        let relevance = self.relevance(profile);
        let specificity = specificity(&item.text);
        let verifiability = verifiability(corroborations);
        let recency = self.recency(item.collected_at);
        let credibility = self.config.credibility.for_source(item.source_type);

        let composite = weights.relevance * relevance
            + weights.specificity * specificity
            + weights.verifiability * verifiability
            + weights.recency * recency
            + weights.credibility * credibility;

        let breakdown = QualityBreakdown {
            relevance,
            specificity,
            verifiability,
            recency,
            credibility,
            composite: composite.clamp(0.0, 1.0),
        };

        if [
            relevance,
            specificity,
            verifiability,
            recency,
            credibility,
            composite,
        ]
        .iter()
        .all(|value| value.is_finite())
        {
            breakdown
        } else {
            QualityBreakdown::default()
        }
    }

    fn relevance(&self, profile: &ItemProfile) -> f64 {
        if self.keywords.is_empty() {
            return 0.5;
        }
        let hits = self
            .keywords
            .iter()
            .filter(|keyword| profile.tokens.contains(keyword.as_str()))
            .count();
        let saturation = self.config.relevance_saturation.min(self.keywords.len()).max(1);
        (hits as f64 / saturation as f64).min(1.0)
    }

    fn recency(&self, collected_at: Option<DateTime<Utc>>) -> f64 {
        let Some(collected_at) = collected_at else {
            return self.config.unknown_recency;
        };
        let age_days = (self.as_of - collected_at).num_seconds() as f64 / 86_400.0;
        if age_days <= 0.0 {
            return 1.0;
        }
        (-3.0 * age_days / self.config.recency_horizon_days).exp()
    }
}

struct ItemProfile {
    host: Option<String>,
    category: crate::scoring::domain::EvidenceCategory,
    tokens: BTreeSet<String>,
}

impl ItemProfile {
    fn new(item: &EvidenceItem) -> Self {
        Self {
            host: source_host(&item.source_url),
            category: item.category,
            tokens: content_tokens(&item.text),
        }
    }

    /// Another item corroborates when it comes from a different host and either
    /// shares the category or overlaps enough in content.
    fn corroborated_by(&self, other: &ItemProfile, min_overlap: f64) -> bool {
        let independent = match (&self.host, &other.host) {
            (Some(host), Some(other_host)) => host != other_host,
            _ => false,
        };
        if !independent {
            return false;
        }
        let same_topic = self.category == other.category
            && self.category != crate::scoring::domain::EvidenceCategory::Unclassified;
        same_topic || jaccard(&self.tokens, &other.tokens) >= min_overlap
    }
}

pub(crate) fn specificity(text: &str) -> f64 {
    let has_quantity = quantity_pattern().is_match(text);
    let has_date = date_pattern().is_match(text);
    let named = named_entity_pattern().captures_iter(text).count();
    let lowered = text.to_lowercase();
    let generic_hits = GENERIC_PHRASES
        .iter()
        .filter(|phrase| lowered.contains(*phrase))
        .count();

    let mut score = 0.0;
    if has_quantity {
        score += 0.4;
    }
    if has_date {
        score += 0.3;
    }
    score += 0.3 * (named as f64 / 3.0).min(1.0);
    score -= 0.1 * generic_hits as f64;
    score.clamp(0.0, 1.0)
}

fn verifiability(corroborations: usize) -> f64 {
    match corroborations {
        0 => 0.0,
        n => (0.6 + 0.2 * (n - 1) as f64).min(1.0),
    }
}
