use serde::{Deserialize, Serialize};

use crate::scoring::EvidenceId;

/// Narrative statement from a report that needs evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
}

impl Claim {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationClass {
    DirectEvidence,
    SupportingContext,
    CounterEvidence,
    TechnicalSpec,
    MarketData,
    ExpertOpinion,
}

impl CitationClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DirectEvidence => "direct_evidence",
            Self::SupportingContext => "supporting_context",
            Self::CounterEvidence => "counter_evidence",
            Self::TechnicalSpec => "technical_spec",
            Self::MarketData => "market_data",
            Self::ExpertOpinion => "expert_opinion",
        }
    }
}

/// Link from a claim to one indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub claim_id: String,
    pub chunk_id: String,
    pub evidence_item_id: EvidenceId,
    pub source_url: Option<String>,
    pub excerpt: String,
    pub relevance_score: f64,
    pub similarity_score: f64,
    pub combined_score: f64,
    pub classification: CitationClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Supported,
    Unsupported,
}

/// How candidates were found for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Vector,
    Hybrid,
    Lexical,
}

/// Citation result for one claim, including how much of the pipeline ran degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimCitations {
    pub claim_id: String,
    pub status: SupportStatus,
    pub citations: Vec<Citation>,
    pub retrieval: RetrievalMode,
    pub candidates_considered: usize,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
}

impl ClaimCitations {
    pub fn is_supported(&self) -> bool {
        self.status == SupportStatus::Supported
    }
}
