use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::citations::{CitationMatcher, CitationSettings};
use crate::evidence::RawEvidence;
use crate::providers::{
    ChunkHit, EmbeddingService, HashingEmbedder, InMemoryChunkIndex, IndexError, OverlapReranker,
    RerankService, VectorIndex,
};
use crate::scoring::{ScoringConfig, ScoringEngine};
use crate::segmentation::{EvidenceChunk, SegmentationPipeline};
use crate::service::repository::{RepositoryError, ScoreId, ScoreRecord, ScoreRepository};
use crate::service::{diligence_router, DiligenceService};

pub(super) fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0)
        .single()
        .expect("valid date")
}

pub(super) fn record(id: &str, source: &str, url: &str, category: &str, text: &str) -> RawEvidence {
    RawEvidence {
        id: Some(id.to_string()),
        source_type: Some(source.to_string()),
        source_url: Some(url.to_string()),
        category: Some(category.to_string()),
        text: Some(text.to_string()),
        collected_at: Some("2025-09-01".to_string()),
    }
}

pub(super) fn evidence() -> Vec<RawEvidence> {
    vec![
        record(
            "ev-k8s",
            "primary",
            "https://acme.io/engineering",
            "tech_stack",
            "Production services run on Kubernetes clusters managed with Terraform.",
        ),
        record(
            "ev-market",
            "secondary",
            "https://analyst.example/acme",
            "market_size",
            "The observability market reached $12 billion in 2024.",
        ),
        record(
            "ev-team",
            "primary",
            "https://acme.io/about",
            "leadership",
            "CTO Dana Reyes previously led platform engineering at Stripe.",
        ),
        RawEvidence {
            id: Some("ev-broken".to_string()),
            text: Some("No source type on this one.".to_string()),
            ..RawEvidence::default()
        },
    ]
}

pub(super) fn build_service_with<R>(
    repository: Arc<R>,
    reranker: Option<Arc<dyn RerankService>>,
) -> DiligenceService<R>
where
    R: ScoreRepository + 'static,
{
    build_service_on(repository, reranker, Arc::new(InMemoryChunkIndex::new()))
}

pub(super) fn build_service_on<R>(
    repository: Arc<R>,
    reranker: Option<Arc<dyn RerankService>>,
    index: Arc<dyn VectorIndex>,
) -> DiligenceService<R>
where
    R: ScoreRepository + 'static,
{
    let embedder: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedder::new(64));
    let segmentation =
        SegmentationPipeline::new(embedder.clone(), 400, 4, Duration::from_secs(1));
    let matcher = CitationMatcher::new(
        embedder,
        reranker,
        index.clone(),
        CitationSettings::default(),
    );
    DiligenceService::new(
        repository,
        ScoringEngine::new(ScoringConfig::default()),
        segmentation,
        index,
        matcher,
    )
}

pub(super) fn build_service() -> (DiligenceService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = build_service_with(repository.clone(), Some(Arc::new(OverlapReranker)));
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ScoreId, ScoreRecord>>>,
}

impl ScoreRepository for MemoryRepository {
    fn insert(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.score_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.score_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ScoreId) -> Result<Option<ScoreRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<ScoreRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.score_id.cmp(&a.score_id));
        records.truncate(limit);
        Ok(records)
    }
}

pub(super) struct UnavailableRepository;

impl ScoreRepository for UnavailableRepository {
    fn insert(&self, _record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ScoreId) -> Result<Option<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct PoisonedIndex;

impl VectorIndex for PoisonedIndex {
    fn append(&self, _chunks: Vec<EvidenceChunk>) -> Result<usize, IndexError> {
        Err(IndexError::Poisoned)
    }

    fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<ChunkHit>, IndexError> {
        Err(IndexError::Poisoned)
    }

    fn chunks(&self) -> Result<Vec<EvidenceChunk>, IndexError> {
        Err(IndexError::Poisoned)
    }

    fn len(&self) -> Result<usize, IndexError> {
        Err(IndexError::Poisoned)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: DiligenceService<MemoryRepository>) -> axum::Router {
    diligence_router(Arc::new(service))
}
