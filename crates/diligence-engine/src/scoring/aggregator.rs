use std::collections::BTreeSet;

use super::config::ScoringConfig;
use super::domain::{Dimension, DimensionScore, EvidenceCategory, EvidenceItem};
use super::signals::SignalScorer;

/// Computes a raw score, confidence, and missing critical categories for one dimension.
///
/// `items` may contain evidence for any dimension; only items whose category maps to
/// `dimension` are considered.
pub(crate) fn aggregate_dimension(
    dimension: Dimension,
    items: &[EvidenceItem],
    scorer: &dyn SignalScorer,
    config: &ScoringConfig,
) -> DimensionScore {
    let relevant: Vec<&EvidenceItem> = items
        .iter()
        .filter(|item| item.category.dimension() == Some(dimension))
        .collect();

    let present: BTreeSet<EvidenceCategory> = relevant.iter().map(|item| item.category).collect();
    let missing_critical: Vec<EvidenceCategory> = config
        .critical_requirements
        .required(dimension)
        .iter()
        .copied()
        .filter(|category| !present.contains(category))
        .collect();

    if relevant.is_empty() {
        return DimensionScore {
            dimension,
            raw_score: 0.0,
            confidence: 0.0,
            evidence_count: 0,
            missing_critical,
        };
    }

    let signals: Vec<f64> = relevant
        .iter()
        .map(|item| bounded(scorer.score(item, dimension), 0.0, 100.0))
        .collect();
    let qualities: Vec<f64> = relevant
        .iter()
        .map(|item| bounded(item.quality_score, 0.0, 1.0))
        .collect();

    let total_quality: f64 = qualities.iter().sum();
    let raw_score = if total_quality > 0.0 {
        signals
            .iter()
            .zip(&qualities)
            .map(|(signal, quality)| signal * quality)
            .sum::<f64>()
            / total_quality
    } else {
        signals.iter().sum::<f64>() / signals.len() as f64
    };

    let count = relevant.len();
    let volume = (count as f64 / config.target_evidence_per_dimension as f64).min(1.0);
    let average_quality = total_quality / count as f64;
    let expected = dimension.categories();
    let covered = expected
        .iter()
        .filter(|category| present.contains(category))
        .count();
    let coverage = covered as f64 / expected.len() as f64;

    let weights = &config.confidence;
    let confidence =
        weights.volume * volume + weights.quality * average_quality + weights.coverage * coverage;

    DimensionScore {
        dimension,
        raw_score: bounded(raw_score, 0.0, 100.0),
        confidence: bounded(confidence, 0.0, 1.0),
        evidence_count: count,
        missing_critical,
    }
}

/// Clamps into range, mapping non-finite values to the lower bound.
fn bounded(value: f64, low: f64, high: f64) -> f64 {
    if value.is_finite() {
        value.clamp(low, high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::{EvidenceId, SourceType};

    struct FixedScorer(f64);

    impl SignalScorer for FixedScorer {
        fn score(&self, item: &EvidenceItem, _dimension: Dimension) -> f64 {
            if item.text.contains("strong") {
                self.0
            } else {
                self.0 / 2.0
            }
        }
    }

    fn item(category: EvidenceCategory, text: &str, quality: f64) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId(format!("{:?}-{text}", category)),
            source_type: SourceType::Primary,
            source_url: "https://acme.io".to_string(),
            category,
            text: text.to_string(),
            collected_at: None,
            quality_score: quality,
        }
    }

    #[test]
    fn raw_score_is_quality_weighted() {
        let config = ScoringConfig::default();
        let items = vec![
            item(EvidenceCategory::TechStack, "strong", 0.9),
            item(EvidenceCategory::Infrastructure, "weak", 0.3),
            item(EvidenceCategory::Pricing, "strong", 1.0),
        ];

        let score = aggregate_dimension(Dimension::Technical, &items, &FixedScorer(80.0), &config);

        assert_eq!(score.evidence_count, 2);
        let expected = (80.0 * 0.9 + 40.0 * 0.3) / 1.2;
        assert!((score.raw_score - expected).abs() < 1e-9);
        assert_eq!(
            score.missing_critical,
            vec![
                EvidenceCategory::SecurityHeaders,
                EvidenceCategory::TestCoverage
            ]
        );
    }

    #[test]
    fn confidence_blends_volume_quality_and_coverage() {
        let config = ScoringConfig::default();
        let items = vec![
            item(EvidenceCategory::Leadership, "strong", 0.8),
            item(EvidenceCategory::TeamSize, "strong", 0.6),
        ];

        let score = aggregate_dimension(Dimension::Team, &items, &FixedScorer(70.0), &config);

        let expected = 0.4 * (2.0 / 5.0) + 0.3 * 0.7 + 0.3 * (2.0 / 4.0);
        assert!((score.confidence - expected).abs() < 1e-9);
        assert!(score.missing_critical.is_empty());
    }

    #[test]
    fn zero_quality_falls_back_to_plain_mean() {
        let config = ScoringConfig::default();
        let items = vec![
            item(EvidenceCategory::Revenue, "strong", 0.0),
            item(EvidenceCategory::FundingHistory, "weak", 0.0),
        ];
        let score = aggregate_dimension(Dimension::Financial, &items, &FixedScorer(60.0), &config);
        assert_eq!(score.raw_score, 45.0);
    }

    #[test]
    fn empty_dimension_reports_every_requirement_missing() {
        let config = ScoringConfig::default();
        let score = aggregate_dimension(Dimension::Market, &[], &FixedScorer(90.0), &config);
        assert_eq!(score.raw_score, 0.0);
        assert_eq!(score.confidence, 0.0);
        assert_eq!(score.missing_critical.len(), 2);
    }

    #[test]
    fn out_of_range_scorers_are_clamped() {
        let config = ScoringConfig::default();
        let items = vec![item(EvidenceCategory::MarketSize, "strong", 0.5)];
        let score = aggregate_dimension(Dimension::Market, &items, &FixedScorer(400.0), &config);
        assert_eq!(score.raw_score, 100.0);
        let nan = aggregate_dimension(Dimension::Market, &items, &FixedScorer(f64::NAN), &config);
        assert_eq!(nan.raw_score, 0.0);
    }
}
