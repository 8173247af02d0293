use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::domain::CitationClass;
use crate::scoring::{Dimension, SourceType};
use crate::segmentation::EvidenceChunk;
use crate::text::{content_tokens, coverage};

/// Negation and reversal phrases, matched on word boundaries.
fn contradiction_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:not|no longer|never|deprecated|discontinued|migrated away|moved away|replaced by|was replaced|contrary|however|lacks|without|\w+n't)\b",
        )
        .expect("contradiction pattern compiles")
    })
}

fn opinion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:according to|analysts?|experts?|believes?|expects?|in our view|recommends|said|says|predicts)\b",
        )
        .expect("opinion pattern compiles")
    })
}

fn markers(pattern: &Regex, text: &str) -> BTreeSet<String> {
    pattern
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}

/// Claim term coverage at which a highly relevant chunk counts as direct evidence.
const DIRECT_COVERAGE: f64 = 0.8;
const DIRECT_RELEVANCE: f64 = 0.85;

/// Labels a selected chunk's relationship to the claim. First matching rule wins.
pub fn classify(claim: &str, chunk: &EvidenceChunk, relevance: f64) -> CitationClass {
    let text = chunk.text.to_lowercase();
    let claim_markers = markers(contradiction_pattern(), &claim.to_lowercase());

    let contradicts = markers(contradiction_pattern(), &text)
        .iter()
        .any(|marker| !claim_markers.contains(marker));
    if contradicts {
        return CitationClass::CounterEvidence;
    }

    let claim_coverage = coverage(&content_tokens(claim), &content_tokens(&chunk.text));
    if relevance >= DIRECT_RELEVANCE
        && claim_coverage >= DIRECT_COVERAGE
        && chunk.source_type != SourceType::Tertiary
    {
        return CitationClass::DirectEvidence;
    }

    match chunk.category.dimension() {
        Some(Dimension::Technical) => return CitationClass::TechnicalSpec,
        Some(Dimension::Market | Dimension::Financial) => return CitationClass::MarketData,
        _ => {}
    }

    if opinion_pattern().is_match(&text) || chunk.source_type == SourceType::Tertiary
    {
        return CitationClass::ExpertOpinion;
    }

    CitationClass::SupportingContext
}
