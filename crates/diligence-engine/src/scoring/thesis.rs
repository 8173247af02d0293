use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{Dimension, DimensionScore};
use super::ScoringError;

/// Allowed drift when checking that criterion weights add up to 100.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Supported investment thesis archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThesisType {
    AccelerateOrganicGrowth,
    BuyAndBuild,
    DigitalTransformation,
    Custom,
}

impl ThesisType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "accelerate-organic-growth" => Some(Self::AccelerateOrganicGrowth),
            "buy-and-build" => Some(Self::BuyAndBuild),
            "digital-transformation" => Some(Self::DigitalTransformation),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Vocabulary signalling that evidence speaks to the archetype.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            ThesisType::AccelerateOrganicGrowth => &[
                "growth",
                "scale",
                "expansion",
                "market",
                "revenue",
                "customers",
                "product",
                "pricing",
                "saas",
                "platform",
                "enterprise",
                "team",
                "leadership",
            ],
            ThesisType::BuyAndBuild => &[
                "integration",
                "api",
                "partner",
                "platform",
                "webhook",
                "developer",
                "documentation",
                "sdk",
                "ecosystem",
                "marketplace",
                "plugins",
                "extensions",
            ],
            ThesisType::DigitalTransformation => &[
                "digital",
                "cloud",
                "modern",
                "innovation",
                "technology",
                "platform",
                "data",
                "ai",
                "automation",
                "architecture",
                "infrastructure",
                "security",
                "compliance",
            ],
            ThesisType::Custom => &[],
        }
    }
}

/// One weighted criterion as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisCriterion {
    pub name: String,
    pub weight: f64,
    pub dimension: String,
}

impl ThesisCriterion {
    pub fn new(name: impl Into<String>, weight: f64, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            weight,
            dimension: dimension.label().to_string(),
        }
    }
}

/// Caller-supplied thesis, unchecked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisDefinition {
    #[serde(rename = "type")]
    pub thesis_type: ThesisType,
    pub criteria: Vec<ThesisCriterion>,
}

impl ThesisDefinition {
    /// Default criteria for the archetype; custom theses start empty.
    pub fn preset(thesis_type: ThesisType) -> Self {
        let criteria = match thesis_type {
            ThesisType::AccelerateOrganicGrowth => vec![
                ThesisCriterion::new("Market expansion potential", 30.0, Dimension::Market),
                ThesisCriterion::new("Revenue growth trajectory", 25.0, Dimension::Financial),
                ThesisCriterion::new("Scalable go-to-market", 20.0, Dimension::Business),
                ThesisCriterion::new("Platform scalability", 15.0, Dimension::Technical),
                ThesisCriterion::new("Leadership depth", 10.0, Dimension::Team),
            ],
            ThesisType::BuyAndBuild => vec![
                ThesisCriterion::new("API and integration surface", 35.0, Dimension::Technical),
                ThesisCriterion::new("Partner ecosystem", 25.0, Dimension::Business),
                ThesisCriterion::new("Fragmented market position", 20.0, Dimension::Market),
                ThesisCriterion::new("Acquisition funding capacity", 10.0, Dimension::Financial),
                ThesisCriterion::new("Integration leadership", 10.0, Dimension::Team),
            ],
            ThesisType::DigitalTransformation => vec![
                ThesisCriterion::new("Cloud architecture", 40.0, Dimension::Technical),
                ThesisCriterion::new("Data and automation maturity", 20.0, Dimension::Business),
                ThesisCriterion::new("Engineering leadership", 15.0, Dimension::Team),
                ThesisCriterion::new("Digital market demand", 15.0, Dimension::Market),
                ThesisCriterion::new("Investment runway", 10.0, Dimension::Financial),
            ],
            ThesisType::Custom => Vec::new(),
        };

        Self {
            thesis_type,
            criteria,
        }
    }

    /// Checks structure before any evidence is touched.
    pub fn validate(&self) -> Result<ValidatedThesis, ScoringError> {
        if self.criteria.is_empty() {
            return Err(invalid("thesis declares no criteria"));
        }

        let mut criteria = Vec::with_capacity(self.criteria.len());
        let mut total = 0.0;
        for criterion in &self.criteria {
            if !criterion.weight.is_finite() || !(0.0..=100.0).contains(&criterion.weight) {
                return Err(invalid(format!(
                    "criterion '{}' has weight {} outside 0-100",
                    criterion.name, criterion.weight
                )));
            }
            let dimension = Dimension::parse(&criterion.dimension).ok_or_else(|| {
                invalid(format!(
                    "criterion '{}' references unknown dimension '{}'",
                    criterion.name, criterion.dimension
                ))
            })?;
            total += criterion.weight;
            criteria.push(WeightedCriterion {
                name: criterion.name.clone(),
                weight: criterion.weight,
                dimension,
            });
        }

        if (total - 100.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid(format!(
                "criterion weights sum to {total:.2}, expected 100"
            )));
        }

        Ok(ValidatedThesis {
            thesis_type: self.thesis_type,
            criteria,
        })
    }
}

fn invalid(reason: impl Into<String>) -> ScoringError {
    ScoringError::InvalidThesisDefinition {
        reason: reason.into(),
    }
}

/// Criterion whose dimension has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCriterion {
    pub name: String,
    pub weight: f64,
    pub dimension: Dimension,
}

/// Thesis that passed validation and can drive a scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedThesis {
    thesis_type: ThesisType,
    criteria: Vec<WeightedCriterion>,
}

impl ValidatedThesis {
    pub fn thesis_type(&self) -> ThesisType {
        self.thesis_type
    }

    pub fn criteria(&self) -> &[WeightedCriterion] {
        &self.criteria
    }

    /// Dimensions referenced by the criteria, first mention first.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut seen = Vec::new();
        for criterion in &self.criteria {
            if !seen.contains(&criterion.dimension) {
                seen.push(criterion.dimension);
            }
        }
        seen
    }

    /// Lowercase keywords from the archetype plus criterion names.
    pub fn keywords(&self) -> BTreeSet<String> {
        let mut keywords: BTreeSet<String> = self
            .thesis_type
            .keywords()
            .iter()
            .map(|keyword| keyword.to_string())
            .collect();
        for criterion in &self.criteria {
            keywords.extend(
                criterion
                    .name
                    .to_ascii_lowercase()
                    .split(|ch: char| !ch.is_ascii_alphanumeric())
                    .filter(|token| token.len() > 2 && !matches!(*token, "and" | "the" | "for"))
                    .map(str::to_string),
            );
        }
        keywords
    }

    /// Sum of each criterion's dimension score scaled by its weight.
    pub fn weighted_score(&self, dimensions: &[DimensionScore]) -> f64 {
        let total: f64 = self
            .criteria
            .iter()
            .map(|criterion| {
                let raw = dimensions
                    .iter()
                    .find(|score| score.dimension == criterion.dimension)
                    .map(|score| score.raw_score)
                    .unwrap_or(0.0);
                raw * criterion.weight / 100.0
            })
            .sum();
        total.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimension_score(dimension: Dimension, raw_score: f64) -> DimensionScore {
        DimensionScore {
            dimension,
            raw_score,
            confidence: 1.0,
            evidence_count: 1,
            missing_critical: Vec::new(),
        }
    }

    fn thesis(weights: &[(f64, &str)]) -> ThesisDefinition {
        ThesisDefinition {
            thesis_type: ThesisType::Custom,
            criteria: weights
                .iter()
                .enumerate()
                .map(|(idx, (weight, dimension))| ThesisCriterion {
                    name: format!("criterion {idx}"),
                    weight: *weight,
                    dimension: dimension.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn presets_are_valid() {
        for thesis_type in [
            ThesisType::AccelerateOrganicGrowth,
            ThesisType::BuyAndBuild,
            ThesisType::DigitalTransformation,
        ] {
            let validated = ThesisDefinition::preset(thesis_type)
                .validate()
                .expect("preset validates");
            assert_eq!(validated.dimensions().len(), 5);
        }
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one_hundred() {
        let err = thesis(&[(50.0, "technical"), (30.0, "market")])
            .validate()
            .expect_err("80 total is rejected");
        assert!(matches!(err, ScoringError::InvalidThesisDefinition { .. }));
        assert!(err.to_string().contains("80.00"));
    }

    #[test]
    fn tolerates_rounding_within_a_hundredth() {
        thesis(&[(33.335, "technical"), (33.33, "market"), (33.33, "team")])
            .validate()
            .expect("99.995 is within tolerance");
    }

    #[test]
    fn rejects_unknown_dimensions() {
        let err = thesis(&[(60.0, "technical"), (40.0, "culture")])
            .validate()
            .expect_err("unknown dimension rejected");
        assert!(err.to_string().contains("culture"));
    }

    #[test]
    fn rejects_empty_and_negative_criteria() {
        assert!(thesis(&[]).validate().is_err());
        assert!(thesis(&[(120.0, "technical"), (-20.0, "market")])
            .validate()
            .is_err());
    }

    #[test]
    fn weighted_score_follows_criterion_weights() {
        let validated = thesis(&[(50.0, "technical"), (30.0, "market"), (20.0, "team")])
            .validate()
            .expect("valid thesis");
        let scores = vec![
            dimension_score(Dimension::Technical, 80.0),
            dimension_score(Dimension::Market, 60.0),
            dimension_score(Dimension::Team, 40.0),
        ];
        assert!((validated.weighted_score(&scores) - 66.0).abs() < 1e-9);
    }

    #[test]
    fn keywords_merge_archetype_and_criterion_names() {
        let mut definition = ThesisDefinition::preset(ThesisType::BuyAndBuild);
        definition.criteria[0].name = "Kubernetes operations".to_string();
        let keywords = definition.validate().expect("valid").keywords();
        assert!(keywords.contains("webhook"));
        assert!(keywords.contains("kubernetes"));
        assert!(!keywords.contains("and"));
    }
}
