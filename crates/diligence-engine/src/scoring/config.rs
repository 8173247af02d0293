use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Dimension, EvidenceCategory, SourceType};

/// Tunable constants for every stage of a scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub quality: QualityWeights,
    pub credibility: CredibilityWeights,
    pub recency_horizon_days: f64,
    pub unknown_recency: f64,
    pub relevance_saturation: usize,
    pub corroboration_overlap: f64,
    pub confidence: ConfidenceWeights,
    pub target_evidence_per_dimension: usize,
    pub penalty_per_missing: f64,
    pub max_penalty: f64,
    pub confidence_multiplier_base: f64,
    pub recommendation: RecommendationFloors,
    pub critical_requirements: CriticalRequirements,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality: QualityWeights::default(),
            credibility: CredibilityWeights::default(),
            recency_horizon_days: 365.0,
            unknown_recency: 0.5,
            relevance_saturation: 4,
            corroboration_overlap: 0.2,
            confidence: ConfidenceWeights::default(),
            target_evidence_per_dimension: 5,
            penalty_per_missing: 0.1,
            max_penalty: 0.5,
            confidence_multiplier_base: 0.5,
            recommendation: RecommendationFloors::default(),
            critical_requirements: CriticalRequirements::default(),
        }
    }
}

impl ScoringConfig {
    /// Rejects configurations whose weights or bounds cannot produce in-range scores.
    pub fn validate(&self) -> Result<(), String> {
        let quality_total = self.quality.total();
        if (quality_total - 1.0).abs() > 1e-6 {
            return Err(format!(
                "quality weights must sum to 1.0 (got {quality_total:.3})"
            ));
        }
        let confidence_total = self.confidence.total();
        if (confidence_total - 1.0).abs() > 1e-6 {
            return Err(format!(
                "confidence weights must sum to 1.0 (got {confidence_total:.3})"
            ));
        }
        if !(0.5..=1.0).contains(&self.confidence_multiplier_base) {
            return Err("confidence_multiplier_base must be within 0.5-1".to_string());
        }
        if !(0.0..=0.5).contains(&self.max_penalty) || self.penalty_per_missing < 0.0 {
            return Err("penalty settings must be non-negative and capped at 0.5".to_string());
        }
        if self.recency_horizon_days <= 0.0 {
            return Err("recency_horizon_days must be positive".to_string());
        }
        if self.target_evidence_per_dimension == 0 || self.relevance_saturation == 0 {
            return Err("evidence targets must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Blend of the five quality sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub relevance: f64,
    pub specificity: f64,
    pub verifiability: f64,
    pub recency: f64,
    pub credibility: f64,
}

impl QualityWeights {
    pub fn total(&self) -> f64 {
        self.relevance + self.specificity + self.verifiability + self.recency + self.credibility
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            relevance: 0.30,
            specificity: 0.20,
            verifiability: 0.20,
            recency: 0.15,
            credibility: 0.15,
        }
    }
}

/// Credibility assigned per source tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityWeights {
    pub primary: f64,
    pub secondary: f64,
    pub tertiary: f64,
}

impl CredibilityWeights {
    pub fn for_source(&self, source_type: SourceType) -> f64 {
        match source_type {
            SourceType::Primary => self.primary,
            SourceType::Secondary => self.secondary,
            SourceType::Tertiary => self.tertiary,
        }
    }
}

impl Default for CredibilityWeights {
    fn default() -> Self {
        Self {
            primary: 1.0,
            secondary: 0.7,
            tertiary: 0.4,
        }
    }
}

/// Blend behind a dimension's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub volume: f64,
    pub quality: f64,
    pub coverage: f64,
}

impl ConfidenceWeights {
    pub fn total(&self) -> f64 {
        self.volume + self.quality + self.coverage
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            volume: 0.4,
            quality: 0.3,
            coverage: 0.3,
        }
    }
}

/// Score and confidence floors per recommendation tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationFloors {
    pub strong_buy: TierFloor,
    pub buy: TierFloor,
    pub hold: TierFloor,
}

impl Default for RecommendationFloors {
    fn default() -> Self {
        Self {
            strong_buy: TierFloor {
                score: 80.0,
                confidence: 0.8,
            },
            buy: TierFloor {
                score: 65.0,
                confidence: 0.65,
            },
            hold: TierFloor {
                score: 45.0,
                confidence: 0.4,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierFloor {
    pub score: f64,
    pub confidence: f64,
}

/// Categories each dimension must have at least one item for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalRequirements(pub BTreeMap<Dimension, Vec<EvidenceCategory>>);

impl CriticalRequirements {
    pub fn required(&self, dimension: Dimension) -> &[EvidenceCategory] {
        self.0
            .get(&dimension)
            .map(|categories| categories.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for CriticalRequirements {
    fn default() -> Self {
        use EvidenceCategory::*;
        let mut table = BTreeMap::new();
        table.insert(
            Dimension::Technical,
            vec![TechStack, Infrastructure, SecurityHeaders, TestCoverage],
        );
        table.insert(Dimension::Business, vec![BusinessModel, Pricing, Customers]);
        table.insert(Dimension::Market, vec![MarketSize, Competitors]);
        table.insert(Dimension::Team, vec![Leadership, TeamSize]);
        table.insert(Dimension::Financial, vec![FundingHistory, Revenue]);
        Self(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ScoringConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn rejects_unbalanced_quality_weights() {
        let mut config = ScoringConfig::default();
        config.quality.relevance = 0.5;
        let err = config.validate().expect_err("weights sum to 1.2");
        assert!(err.contains("quality weights"));
    }

    #[test]
    fn rejects_penalty_caps_above_one_half() {
        let mut config = ScoringConfig::default();
        config.max_penalty = 0.8;
        let err = config.validate().expect_err("cap above 0.5");
        assert!(err.contains("capped at 0.5"));

        config.max_penalty = 0.5;
        config.penalty_per_missing = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_multiplier_base_below_one_half() {
        let mut config = ScoringConfig::default();
        config.confidence_multiplier_base = 0.2;
        let err = config.validate().expect_err("base below 0.5");
        assert!(err.contains("confidence_multiplier_base"));

        config.confidence_multiplier_base = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_keep_defaults() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"max_penalty": 0.4, "credibility": {"tertiary": 0.2}}"#)
                .expect("partial config parses");
        assert_eq!(config.max_penalty, 0.4);
        assert_eq!(config.credibility.tertiary, 0.2);
        assert_eq!(config.credibility.primary, 1.0);
        assert_eq!(
            config.critical_requirements.required(Dimension::Technical).len(),
            4
        );
    }
}
