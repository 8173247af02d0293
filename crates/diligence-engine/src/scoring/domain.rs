use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for collected evidence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub String);

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provenance tier of a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Primary,
    Secondary,
    Tertiary,
}

impl SourceType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "tertiary" => Some(Self::Tertiary),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SourceType::Primary => "primary",
            SourceType::Secondary => "secondary",
            SourceType::Tertiary => "tertiary",
        }
    }
}

/// Analytical dimension evidence is grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Technical,
    Business,
    Market,
    Team,
    Financial,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Technical,
        Dimension::Business,
        Dimension::Market,
        Dimension::Team,
        Dimension::Financial,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "technical" => Some(Self::Technical),
            "business" => Some(Self::Business),
            "market" => Some(Self::Market),
            "team" => Some(Self::Team),
            "financial" => Some(Self::Financial),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Dimension::Technical => "technical",
            Dimension::Business => "business",
            Dimension::Market => "market",
            Dimension::Team => "team",
            Dimension::Financial => "financial",
        }
    }

    /// Sub-topics expected within the dimension, used for coverage.
    pub fn categories(self) -> &'static [EvidenceCategory] {
        use EvidenceCategory::*;
        match self {
            Dimension::Technical => &[
                TechStack,
                Infrastructure,
                SecurityHeaders,
                TestCoverage,
                ApiDesign,
                CodeQuality,
            ],
            Dimension::Business => &[BusinessModel, Pricing, Customers, Partnerships],
            Dimension::Market => &[MarketSize, Competitors, MarketPosition],
            Dimension::Team => &[Leadership, TeamSize, Hiring, Culture],
            Dimension::Financial => &[FundingHistory, Revenue, GrowthMetrics, Valuation],
        }
    }
}

/// Fixed evidence taxonomy shared with the collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    TechStack,
    Infrastructure,
    SecurityHeaders,
    TestCoverage,
    ApiDesign,
    CodeQuality,
    BusinessModel,
    Pricing,
    Customers,
    Partnerships,
    MarketSize,
    Competitors,
    MarketPosition,
    Leadership,
    TeamSize,
    Hiring,
    Culture,
    FundingHistory,
    Revenue,
    GrowthMetrics,
    Valuation,
    #[serde(other)]
    Unclassified,
}

impl EvidenceCategory {
    /// Parses a collector tag; anything outside the taxonomy is unclassified.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        serde_json::from_value(serde_json::Value::String(normalized))
            .unwrap_or(EvidenceCategory::Unclassified)
    }

    pub fn dimension(self) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|dimension| dimension.categories().contains(&self))
    }

    pub fn label(self) -> String {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(label)) => label,
            _ => "unclassified".to_string(),
        }
    }
}

/// Normalized evidence ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub source_type: SourceType,
    pub source_url: String,
    pub category: EvidenceCategory,
    pub text: String,
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quality_score: f64,
}

/// Sub-scores behind an item's quality composite, kept for audits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub relevance: f64,
    pub specificity: f64,
    pub verifiability: f64,
    pub recency: f64,
    pub credibility: f64,
    pub composite: f64,
}

/// Per-dimension aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub raw_score: f64,
    pub confidence: f64,
    pub evidence_count: usize,
    pub missing_critical: Vec<EvidenceCategory>,
}

/// Letter grade derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

/// Investment recommendation, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Recommendation {
    Pass,
    Hold,
    Buy,
    StrongBuy,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Pass => "pass",
            Recommendation::Hold => "hold",
            Recommendation::Buy => "buy",
            Recommendation::StrongBuy => "strong_buy",
        }
    }
}

/// Immutable outcome of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveScore {
    pub per_dimension: Vec<DimensionScore>,
    pub weighted_score: f64,
    pub overall_confidence: f64,
    pub confidence_multiplier: f64,
    pub penalty: f64,
    pub final_score: u8,
    pub grade: Grade,
    pub recommendation: Recommendation,
}

impl ComprehensiveScore {
    pub fn summary(&self) -> String {
        format!(
            "final score {} (grade {:?}, {}) at {:.0}% confidence",
            self.final_score,
            self.grade,
            self.recommendation.label(),
            self.overall_confidence * 100.0
        )
    }

    /// Distinct missing critical categories across every scored dimension.
    pub fn missing_critical(&self) -> Vec<EvidenceCategory> {
        let mut missing: Vec<EvidenceCategory> = self
            .per_dimension
            .iter()
            .flat_map(|score| score.missing_critical.iter().copied())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
