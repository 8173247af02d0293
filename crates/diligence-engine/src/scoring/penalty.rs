use std::collections::BTreeSet;

use super::config::ScoringConfig;
use super::domain::{DimensionScore, EvidenceCategory};

/// Capped deduction for critical categories with no evidence at all.
pub fn absence_penalty(missing_count: usize, config: &ScoringConfig) -> f64 {
    (config.penalty_per_missing * missing_count as f64).min(config.max_penalty)
}

/// Distinct missing critical categories across the scored dimensions.
pub fn missing_critical(dimensions: &[DimensionScore]) -> BTreeSet<EvidenceCategory> {
    dimensions
        .iter()
        .flat_map(|score| score.missing_critical.iter().copied())
        .collect()
}
