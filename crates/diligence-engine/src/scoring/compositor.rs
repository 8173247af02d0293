use super::config::{RecommendationFloors, ScoringConfig};
use super::domain::{ComprehensiveScore, DimensionScore, Grade, Recommendation};

/// Folds the weighted score, confidence, and penalty into the final result.
pub fn compose(
    per_dimension: Vec<DimensionScore>,
    weighted_score: f64,
    penalty: f64,
    config: &ScoringConfig,
) -> ComprehensiveScore {
    let overall_confidence = overall_confidence(&per_dimension);
    let base = config.confidence_multiplier_base;
    let confidence_multiplier = base + (1.0 - base) * overall_confidence;
    let weighted_score = weighted_score.clamp(0.0, 100.0);
    let penalty = penalty.clamp(0.0, config.max_penalty);

    let raw_final = weighted_score * confidence_multiplier * (1.0 - penalty);
    let final_score = raw_final.round().clamp(0.0, 100.0) as u8;

    ComprehensiveScore {
        per_dimension,
        weighted_score,
        overall_confidence,
        confidence_multiplier,
        penalty,
        final_score,
        grade: grade(final_score),
        recommendation: recommendation(
            f64::from(final_score),
            overall_confidence,
            &config.recommendation,
        ),
    }
}

/// Evidence-count-weighted mean of dimension confidences.
pub fn overall_confidence(dimensions: &[DimensionScore]) -> f64 {
    let total: usize = dimensions.iter().map(|score| score.evidence_count).sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: f64 = dimensions
        .iter()
        .map(|score| score.confidence * score.evidence_count as f64)
        .sum();
    (weighted / total as f64).clamp(0.0, 1.0)
}

pub fn grade(final_score: u8) -> Grade {
    match final_score {
        85..=u8::MAX => Grade::A,
        70..=84 => Grade::B,
        55..=69 => Grade::C,
        40..=54 => Grade::D,
        _ => Grade::F,
    }
}

/// Lower of the tier earned by score and the tier earned by confidence.
pub fn recommendation(score: f64, confidence: f64, floors: &RecommendationFloors) -> Recommendation {
    let by_score = if score >= floors.strong_buy.score {
        Recommendation::StrongBuy
    } else if score >= floors.buy.score {
        Recommendation::Buy
    } else if score >= floors.hold.score {
        Recommendation::Hold
    } else {
        Recommendation::Pass
    };

    let by_confidence = if confidence >= floors.strong_buy.confidence {
        Recommendation::StrongBuy
    } else if confidence >= floors.buy.confidence {
        Recommendation::Buy
    } else if confidence >= floors.hold.confidence {
        Recommendation::Hold
    } else {
        Recommendation::Pass
    };

    by_score.min(by_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::Dimension;

    fn dimension(dimension: Dimension, confidence: f64, evidence_count: usize) -> DimensionScore {
        DimensionScore {
            dimension,
            raw_score: 0.0,
            confidence,
            evidence_count,
            missing_critical: Vec::new(),
        }
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade(100), Grade::A);
        assert_eq!(grade(85), Grade::A);
        assert_eq!(grade(84), Grade::B);
        assert_eq!(grade(70), Grade::B);
        assert_eq!(grade(55), Grade::C);
        assert_eq!(grade(54), Grade::D);
        assert_eq!(grade(40), Grade::D);
        assert_eq!(grade(39), Grade::F);
    }

    #[test]
    fn recommendation_never_rounds_up_on_score_alone() {
        let floors = RecommendationFloors::default();
        assert_eq!(recommendation(92.0, 0.85, &floors), Recommendation::StrongBuy);
        assert_eq!(recommendation(92.0, 0.5, &floors), Recommendation::Hold);
        assert_eq!(recommendation(50.0, 0.95, &floors), Recommendation::Hold);
        assert_eq!(recommendation(92.0, 0.1, &floors), Recommendation::Pass);
        assert_eq!(recommendation(70.0, 0.7, &floors), Recommendation::Buy);
    }

    #[test]
    fn overall_confidence_weights_by_evidence_count() {
        let dims = vec![
            dimension(Dimension::Technical, 0.9, 2),
            dimension(Dimension::Market, 0.7, 1),
            dimension(Dimension::Team, 0.5, 1),
        ];
        assert!((overall_confidence(&dims) - 0.75).abs() < 1e-12);
        assert_eq!(overall_confidence(&[]), 0.0);
    }

    #[test]
    fn zero_evidence_halves_the_weighted_score() {
        let config = ScoringConfig::default();
        let score = compose(vec![dimension(Dimension::Team, 0.0, 0)], 60.0, 0.0, &config);
        assert_eq!(score.confidence_multiplier, 0.5);
        assert_eq!(score.final_score, 30);
        assert_eq!(score.recommendation, Recommendation::Pass);
    }

    #[test]
    fn final_score_stays_in_range() {
        let config = ScoringConfig::default();
        let score = compose(vec![dimension(Dimension::Team, 1.0, 3)], 250.0, -1.0, &config);
        assert_eq!(score.final_score, 100);
        assert_eq!(score.penalty, 0.0);
        let floor = compose(vec![dimension(Dimension::Team, 1.0, 3)], 10.0, 0.9, &config);
        assert_eq!(floor.penalty, 0.5);
        assert_eq!(floor.final_score, 5);
    }
}
