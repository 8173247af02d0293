//! Evidence quality scoring, dimension aggregation, thesis weighting, and final composition.

mod aggregator;
mod compositor;
pub mod config;
pub mod domain;
mod penalty;
mod quality;
mod signals;
pub mod thesis;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::evidence::{normalize_batch, MalformedEvidence, RawEvidence};
pub use compositor::{compose, grade, overall_confidence, recommendation};
pub use config::ScoringConfig;
pub use domain::{
    ComprehensiveScore, Dimension, DimensionScore, EvidenceCategory, EvidenceId, EvidenceItem,
    Grade, QualityBreakdown, Recommendation, SourceType,
};
pub use penalty::{absence_penalty, missing_critical};
pub use quality::QualityScorer;
pub use signals::{KeywordSignalScorer, SignalScorer};
pub use thesis::{ThesisCriterion, ThesisDefinition, ThesisType, ValidatedThesis};

/// Structural errors that stop a scoring run before any evidence is read.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid thesis definition: {reason}")]
    InvalidThesisDefinition { reason: String },
}

/// Evidence item paired with the quality sub-scores that produced its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvidence {
    pub item: EvidenceItem,
    pub quality: QualityBreakdown,
}

/// Scoring output plus the audit trail behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringReport {
    pub score: ComprehensiveScore,
    pub evidence: Vec<ScoredEvidence>,
    pub rejected: Vec<MalformedEvidence>,
}

/// Stateless engine applying one scoring configuration to evidence snapshots.
pub struct ScoringEngine {
    config: ScoringConfig,
    signals: Arc<dyn SignalScorer>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_signal_scorer(config, Arc::new(KeywordSignalScorer::default()))
    }

    pub fn with_signal_scorer(config: ScoringConfig, signals: Arc<dyn SignalScorer>) -> Self {
        Self { config, signals }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Normalizes collector records and scores them. The thesis is checked first.
    pub fn score_records(
        &self,
        records: &[RawEvidence],
        thesis: &ThesisDefinition,
        as_of: DateTime<Utc>,
    ) -> Result<ScoringReport, ScoringError> {
        let validated = thesis.validate()?;
        let batch = normalize_batch(records);
        let mut report = self.score_validated(batch.items, &validated, as_of);
        report.rejected = batch.rejected;
        Ok(report)
    }

    /// Scores already-normalized evidence against a thesis.
    pub fn score(
        &self,
        items: Vec<EvidenceItem>,
        thesis: &ThesisDefinition,
        as_of: DateTime<Utc>,
    ) -> Result<ScoringReport, ScoringError> {
        let validated = thesis.validate()?;
        Ok(self.score_validated(items, &validated, as_of))
    }

    fn score_validated(
        &self,
        mut items: Vec<EvidenceItem>,
        thesis: &ValidatedThesis,
        as_of: DateTime<Utc>,
    ) -> ScoringReport {
        let keywords = thesis.keywords();
        let breakdowns = QualityScorer::new(&self.config, &keywords, as_of).score_batch(&items);
        for (item, breakdown) in items.iter_mut().zip(&breakdowns) {
            item.quality_score = breakdown.composite;
        }

        let per_dimension: Vec<DimensionScore> = thesis
            .dimensions()
            .into_iter()
            .map(|dimension| {
                let score = aggregator::aggregate_dimension(
                    dimension,
                    &items,
                    self.signals.as_ref(),
                    &self.config,
                );
                debug!(
                    dimension = dimension.label(),
                    raw_score = score.raw_score,
                    confidence = score.confidence,
                    evidence = score.evidence_count,
                    "aggregated dimension"
                );
                score
            })
            .collect();

        let weighted_score = thesis.weighted_score(&per_dimension);
        let missing = missing_critical(&per_dimension);
        let penalty = absence_penalty(missing.len(), &self.config);
        let score = compose(per_dimension, weighted_score, penalty, &self.config);

        info!(
            thesis = ?thesis.thesis_type(),
            evidence = items.len(),
            missing_critical = missing.len(),
            final_score = score.final_score,
            "scored evidence snapshot"
        );

        ScoringReport {
            score,
            evidence: items
                .into_iter()
                .zip(breakdowns)
                .map(|(item, quality)| ScoredEvidence { item, quality })
                .collect(),
            rejected: Vec::new(),
        }
    }
}
