//! Diligence service composing ingestion, scoring, persistence, and citation matching.

pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::citations::{CitationMatcher, CitationSettings, Claim, ClaimCitations};
use crate::config::{AppConfig, RerankerMode};
use crate::evidence::{normalize_batch, MalformedEvidence, RawEvidence};
use crate::providers::{
    EmbeddingService, HashingEmbedder, HttpEmbeddingService, HttpRerankService,
    InMemoryChunkIndex, IndexError, OverlapReranker, ProviderError, RerankService, VectorIndex,
};
use crate::scoring::{EvidenceItem, ScoringEngine, ScoringError, ThesisDefinition, ThesisType};
use crate::segmentation::SegmentationPipeline;
pub use repository::{RepositoryError, ScoreId, ScoreRecord, ScoreRepository, ScoreSummaryView};
pub use router::diligence_router;

static SCORE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_score_id() -> ScoreId {
    let id = SCORE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScoreId(format!("score-{id:06}"))
}

/// Evidence batch submitted for ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    pub evidence: Vec<RawEvidence>,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<MalformedEvidence>,
    pub chunks: usize,
    pub embedded: usize,
    pub unembedded: usize,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
}

/// Scoring request. Without inline evidence, everything ingested so far is scored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub thesis: Option<ThesisDefinition>,
    #[serde(default)]
    pub thesis_type: Option<ThesisType>,
    #[serde(default)]
    pub evidence: Option<Vec<RawEvidence>>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl ScoreRequest {
    fn resolve_thesis(&self) -> Result<ThesisDefinition, ServiceError> {
        match (&self.thesis, self.thesis_type) {
            (Some(thesis), _) => Ok(thesis.clone()),
            (None, Some(ThesisType::Custom)) => Err(ServiceError::InvalidRequest(
                "custom theses must supply their criteria".to_string(),
            )),
            (None, Some(thesis_type)) => Ok(ThesisDefinition::preset(thesis_type)),
            (None, None) => Err(ServiceError::InvalidRequest(
                "either thesis or thesis_type is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationRequest {
    pub claims: Vec<Claim>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitationReport {
    pub claims: Vec<ClaimCitations>,
    pub supported: usize,
    pub unsupported: usize,
    pub degraded: bool,
}

impl CitationReport {
    fn from_results(claims: Vec<ClaimCitations>) -> Self {
        let supported = claims.iter().filter(|claim| claim.is_supported()).count();
        Self {
            supported,
            unsupported: claims.len() - supported,
            degraded: claims.iter().any(|claim| claim.degraded),
            claims,
        }
    }
}

/// Service composing the scoring engine, segmentation pipeline, chunk index, and matcher.
pub struct DiligenceService<R> {
    engine: Arc<ScoringEngine>,
    segmentation: SegmentationPipeline,
    index: Arc<dyn VectorIndex>,
    matcher: CitationMatcher,
    evidence: RwLock<Vec<EvidenceItem>>,
    repository: Arc<R>,
}

impl<R> DiligenceService<R>
where
    R: ScoreRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        engine: ScoringEngine,
        segmentation: SegmentationPipeline,
        index: Arc<dyn VectorIndex>,
        matcher: CitationMatcher,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            segmentation,
            index,
            matcher,
            evidence: RwLock::new(Vec::new()),
            repository,
        }
    }

    /// Wires remote services when configured, local fallbacks otherwise.
    pub fn from_config(repository: Arc<R>, config: &AppConfig) -> Result<Self, ServiceError> {
        let services = &config.services;
        let embedder: Arc<dyn EmbeddingService> = match &services.embedding_url {
            Some(url) => Arc::new(HttpEmbeddingService::new(
                url.clone(),
                services.embedding_model.clone(),
                services.embedding_dimensions,
                services.timeout(),
            )?),
            None => Arc::new(HashingEmbedder::new(services.embedding_dimensions)),
        };
        let reranker: Option<Arc<dyn RerankService>> = match (services.reranker, &services.rerank_url) {
            (RerankerMode::Http, Some(url)) => Some(Arc::new(HttpRerankService::new(
                url.clone(),
                services.rerank_model.clone(),
                services.timeout(),
            )?)),
            (RerankerMode::Overlap, _) => Some(Arc::new(OverlapReranker)),
            _ => None,
        };

        let index: Arc<dyn VectorIndex> = Arc::new(InMemoryChunkIndex::new());
        let segmentation = SegmentationPipeline::new(
            embedder.clone(),
            config.retrieval.chunk_max_chars,
            services.concurrency,
            services.timeout(),
        );
        let matcher = CitationMatcher::new(
            embedder.clone(),
            reranker,
            index.clone(),
            CitationSettings {
                top_k: config.retrieval.top_k,
                citations_per_claim: config.retrieval.citations_per_claim,
                concurrency: services.concurrency,
                timeout: services.timeout(),
                ..CitationSettings::default()
            },
        );

        info!(
            embedder = embedder.name(),
            reranker = ?services.reranker,
            dimensions = services.embedding_dimensions,
            "diligence service wired"
        );

        Ok(Self::new(
            repository,
            ScoringEngine::new(config.scoring.clone()),
            segmentation,
            index,
            matcher,
        ))
    }

    /// Normalizes, segments, embeds, and indexes an evidence batch.
    pub async fn ingest(&self, records: &[RawEvidence]) -> Result<IngestReport, ServiceError> {
        let batch = normalize_batch(records);
        let outcome = self.segmentation.process(&batch.items).await;

        let report = IngestReport {
            accepted: batch.items.len(),
            rejected: batch.rejected,
            chunks: outcome.chunks.len(),
            embedded: outcome.embedded,
            unembedded: outcome.unembedded,
            degraded: outcome.degraded(),
            degradations: outcome.failures.clone(),
        };

        self.index.append(outcome.chunks)?;
        {
            let mut store = self
                .evidence
                .write()
                .map_err(|_| ServiceError::Unavailable("evidence store lock poisoned".to_string()))?;
            store.retain(|existing| !batch.items.iter().any(|item| item.id == existing.id));
            store.extend(batch.items);
        }

        if report.degraded {
            warn!(unembedded = report.unembedded, "evidence ingested with degraded embeddings");
        }
        info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            chunks = report.chunks,
            "evidence batch ingested"
        );
        Ok(report)
    }

    /// Scores evidence against a thesis and persists the result.
    pub fn score(&self, request: ScoreRequest) -> Result<ScoreRecord, ServiceError> {
        let thesis = request.resolve_thesis()?;
        let (items, rejected) = match &request.evidence {
            Some(records) => {
                let batch = normalize_batch(records);
                (batch.items, batch.rejected)
            }
            None => (self.evidence_snapshot()?, Vec::new()),
        };
        let as_of = request
            .as_of
            .unwrap_or_else(|| snapshot_as_of(&items));

        let mut report = self.engine.score(items, &thesis, as_of)?;
        report.rejected = rejected;

        let record = ScoreRecord {
            score_id: next_score_id(),
            thesis,
            as_of,
            report,
        };
        let stored = self.repository.insert(record)?;
        info!(
            score_id = %stored.score_id,
            final_score = stored.report.score.final_score,
            "score recorded"
        );
        Ok(stored)
    }

    pub fn get_score(&self, score_id: &ScoreId) -> Result<ScoreRecord, ServiceError> {
        let record = self
            .repository
            .fetch(score_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Matches claims against everything indexed so far.
    pub async fn cite(&self, claims: &[Claim]) -> Result<CitationReport, ServiceError> {
        if let Some(claim) = claims
            .iter()
            .find(|claim| claim.id.trim().is_empty() || claim.text.trim().is_empty())
        {
            return Err(ServiceError::InvalidRequest(format!(
                "claim '{}' needs both an id and text",
                claim.id
            )));
        }

        let results = self.matcher.match_claims(claims).await?;
        let report = CitationReport::from_results(results);
        info!(
            claims = claims.len(),
            supported = report.supported,
            degraded = report.degraded,
            "claims matched"
        );
        Ok(report)
    }

    pub fn evidence_count(&self) -> Result<usize, ServiceError> {
        let store = self
            .evidence
            .read()
            .map_err(|_| ServiceError::Unavailable("evidence store lock poisoned".to_string()))?;
        Ok(store.len())
    }

    pub fn chunk_count(&self) -> Result<usize, ServiceError> {
        Ok(self.index.len()?)
    }

    fn evidence_snapshot(&self) -> Result<Vec<EvidenceItem>, ServiceError> {
        self.evidence
            .read()
            .map(|store| store.clone())
            .map_err(|_| ServiceError::Unavailable("evidence store lock poisoned".to_string()))
    }
}

/// Latest collection time in the snapshot, so rescoring it gives the same result.
/// Undated snapshots fall back to the epoch; their recency does not depend on it.
fn snapshot_as_of(items: &[EvidenceItem]) -> DateTime<Utc> {
    items
        .iter()
        .filter_map(|item| item.collected_at)
        .max()
        .unwrap_or_default()
}

/// Error raised by the diligence service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}
