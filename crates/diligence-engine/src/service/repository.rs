use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{Grade, Recommendation, ScoringReport, ThesisDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreId(pub String);

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repository record holding one scoring run and the inputs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score_id: ScoreId,
    pub thesis: ThesisDefinition,
    pub as_of: DateTime<Utc>,
    pub report: ScoringReport,
}

impl ScoreRecord {
    pub fn summary_view(&self) -> ScoreSummaryView {
        let score = &self.report.score;
        ScoreSummaryView {
            score_id: self.score_id.clone(),
            final_score: score.final_score,
            grade: score.grade,
            recommendation: score.recommendation,
            overall_confidence: score.overall_confidence,
            evidence_count: self.report.evidence.len(),
            rejected_count: self.report.rejected.len(),
            summary: score.summary(),
        }
    }
}

/// Compact projection returned when callers only need the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummaryView {
    pub score_id: ScoreId,
    pub final_score: u8,
    pub grade: Grade,
    pub recommendation: Recommendation,
    pub overall_confidence: f64,
    pub evidence_count: usize,
    pub rejected_count: usize,
    pub summary: String,
}

/// Storage abstraction so the service can be exercised without a database.
pub trait ScoreRepository: Send + Sync {
    fn insert(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError>;
    fn fetch(&self, id: &ScoreId) -> Result<Option<ScoreRecord>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<ScoreRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
