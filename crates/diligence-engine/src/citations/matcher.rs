use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::classify::classify;
use super::domain::{Citation, Claim, ClaimCitations, RetrievalMode, SupportStatus};
use crate::providers::{
    with_timeout, EmbeddingService, IndexError, ProviderError, RerankService, VectorIndex,
};
use crate::segmentation::EvidenceChunk;
use crate::text::{content_tokens, coverage};

/// Tunables for claim matching.
#[derive(Debug, Clone)]
pub struct CitationSettings {
    pub top_k: usize,
    pub citations_per_claim: usize,
    /// Relevance a candidate must strictly exceed to be cited.
    pub relevance_threshold: f64,
    /// Share of the combined score carried by relevance; similarity carries the rest.
    pub relevance_weight: f64,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for CitationSettings {
    fn default() -> Self {
        Self {
            top_k: 20,
            citations_per_claim: 3,
            relevance_threshold: 0.7,
            relevance_weight: 0.7,
            concurrency: 8,
            timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    chunk: EvidenceChunk,
    similarity: f64,
    relevance: f64,
}

impl Candidate {
    fn combined(&self, relevance_weight: f64) -> f64 {
        relevance_weight * self.relevance + (1.0 - relevance_weight) * self.similarity
    }
}

enum Stage {
    Embedding,
    Retrieval { query: Option<Vec<f32>> },
    Reranking { candidates: Vec<Candidate> },
    Selection { candidates: Vec<Candidate> },
    Classification { selected: Vec<Candidate> },
}

struct MatchRun {
    retrieval: RetrievalMode,
    considered: usize,
    degradations: Vec<String>,
}

/// Maps claims to the indexed chunks that support them.
pub struct CitationMatcher {
    embedder: Arc<dyn EmbeddingService>,
    reranker: Option<Arc<dyn RerankService>>,
    index: Arc<dyn VectorIndex>,
    settings: CitationSettings,
}

impl CitationMatcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        reranker: Option<Arc<dyn RerankService>>,
        index: Arc<dyn VectorIndex>,
        settings: CitationSettings,
    ) -> Self {
        Self {
            embedder,
            reranker,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> &CitationSettings {
        &self.settings
    }

    /// Matches claims concurrently; results come back in input order.
    pub async fn match_claims(&self, claims: &[Claim]) -> Result<Vec<ClaimCitations>, IndexError> {
        stream::iter(claims.to_vec())
            .map(|claim| async move { self.match_claim(&claim).await })
            .buffered(self.settings.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    pub async fn match_claim(&self, claim: &Claim) -> Result<ClaimCitations, IndexError> {
        let mut run = MatchRun {
            retrieval: RetrievalMode::Vector,
            considered: 0,
            degradations: Vec::new(),
        };
        let mut stage = Stage::Embedding;

        let citations = loop {
            stage = match stage {
                Stage::Embedding => match self.embed_claim(&claim.text).await {
                    Ok(vector) => Stage::Retrieval {
                        query: Some(vector),
                    },
                    Err(err) => {
                        warn!(claim = %claim.id, error = %err, "claim embedding failed, using lexical retrieval");
                        run.degradations
                            .push(format!("embedding unavailable: {err}"));
                        Stage::Retrieval { query: None }
                    }
                },
                Stage::Retrieval { query } => {
                    let candidates = self.retrieve(&claim.text, query.as_deref(), &mut run)?;
                    run.considered = candidates.len();
                    Stage::Reranking { candidates }
                }
                Stage::Reranking { candidates } => Stage::Selection {
                    candidates: self.rerank(claim, candidates, &mut run).await,
                },
                Stage::Selection { candidates } => Stage::Classification {
                    selected: self.select(candidates),
                },
                Stage::Classification { selected } => {
                    break selected
                        .into_iter()
                        .map(|candidate| self.cite(claim, candidate))
                        .collect::<Vec<Citation>>();
                }
            };
        };

        let status = if citations.is_empty() {
            SupportStatus::Unsupported
        } else {
            SupportStatus::Supported
        };
        debug!(
            claim = %claim.id,
            citations = citations.len(),
            considered = run.considered,
            degraded = !run.degradations.is_empty(),
            "matched claim"
        );

        Ok(ClaimCitations {
            claim_id: claim.id.clone(),
            status,
            citations,
            retrieval: run.retrieval,
            candidates_considered: run.considered,
            degraded: !run.degradations.is_empty(),
            degradations: run.degradations,
        })
    }

    async fn embed_claim(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let provider = self.embedder.name().to_string();
        let vector = with_timeout(&provider, self.settings.timeout, self.embedder.embed(text)).await?;
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(ProviderError::ShapeMismatch {
                provider,
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn retrieve(
        &self,
        claim: &str,
        query: Option<&[f32]>,
        run: &mut MatchRun,
    ) -> Result<Vec<Candidate>, IndexError> {
        let claim_tokens = content_tokens(claim);
        let lexical = |chunk: &EvidenceChunk| coverage(&claim_tokens, &content_tokens(&chunk.text));

        let mut candidates: Vec<Candidate> = Vec::new();
        let vector_hits = match query {
            Some(query) => match self.index.search(query, self.settings.top_k) {
                Ok(hits) => Some(hits),
                Err(IndexError::Poisoned) => return Err(IndexError::Poisoned),
                Err(err) => {
                    warn!(error = %err, "vector search failed, using lexical retrieval");
                    run.degradations.push(format!("vector search failed: {err}"));
                    None
                }
            },
            None => None,
        };

        let chunks = self.index.chunks()?;
        match vector_hits {
            Some(hits) => {
                candidates.extend(hits.into_iter().map(|hit| Candidate {
                    chunk: hit.chunk,
                    similarity: hit.similarity,
                    relevance: 0.0,
                }));
                let unembedded: Vec<Candidate> = chunks
                    .into_iter()
                    .filter(|chunk| chunk.embedding.is_none())
                    .map(|chunk| Candidate {
                        similarity: lexical(&chunk),
                        chunk,
                        relevance: 0.0,
                    })
                    .filter(|candidate| candidate.similarity > 0.0)
                    .collect();
                run.retrieval = if unembedded.is_empty() {
                    RetrievalMode::Vector
                } else {
                    RetrievalMode::Hybrid
                };
                candidates.extend(unembedded);
            }
            None => {
                run.retrieval = RetrievalMode::Lexical;
                candidates.extend(
                    chunks
                        .into_iter()
                        .map(|chunk| Candidate {
                            similarity: lexical(&chunk),
                            chunk,
                            relevance: 0.0,
                        })
                        .filter(|candidate| candidate.similarity > 0.0),
                );
            }
        }

        sort_by_score(&mut candidates, |candidate| candidate.similarity);
        candidates.truncate(self.settings.top_k);
        Ok(candidates)
    }

    async fn rerank(
        &self,
        claim: &Claim,
        mut candidates: Vec<Candidate>,
        run: &mut MatchRun,
    ) -> Vec<Candidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let scores = match &self.reranker {
            Some(reranker) => {
                let texts: Vec<String> = candidates
                    .iter()
                    .map(|candidate| candidate.chunk.text.clone())
                    .collect();
                let result = with_timeout(
                    reranker.name(),
                    self.settings.timeout,
                    reranker.rerank(&claim.text, &texts),
                )
                .await
                .and_then(|scores| {
                    if scores.len() == texts.len() {
                        Ok(scores)
                    } else {
                        Err(ProviderError::ShapeMismatch {
                            provider: reranker.name().to_string(),
                            expected: texts.len(),
                            actual: scores.len(),
                        })
                    }
                });
                match result {
                    Ok(scores) => Some(scores),
                    Err(err) => {
                        warn!(claim = %claim.id, error = %err, "reranking failed, using similarity");
                        run.degradations.push(format!("reranking unavailable: {err}"));
                        None
                    }
                }
            }
            None => {
                run.degradations
                    .push("reranking unavailable: no reranker configured".to_string());
                None
            }
        };

        match scores {
            Some(scores) => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.relevance = if score.is_finite() {
                        score.clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                }
                sort_by_score(&mut candidates, |candidate| candidate.relevance);
            }
            None => {
                for candidate in &mut candidates {
                    candidate.relevance = candidate.similarity;
                }
            }
        }
        candidates
    }

    fn select(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let weight = self.settings.relevance_weight;
        let mut selected: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| candidate.relevance > self.settings.relevance_threshold)
            .collect();
        sort_by_score(&mut selected, |candidate| candidate.combined(weight));
        selected.truncate(self.settings.citations_per_claim);
        selected
    }

    fn cite(&self, claim: &Claim, candidate: Candidate) -> Citation {
        let combined_score = candidate.combined(self.settings.relevance_weight);
        let classification = classify(&claim.text, &candidate.chunk, candidate.relevance);
        Citation {
            claim_id: claim.id.clone(),
            chunk_id: candidate.chunk.id,
            evidence_item_id: candidate.chunk.evidence_item_id,
            source_url: candidate.chunk.source_url,
            excerpt: candidate.chunk.text,
            relevance_score: candidate.relevance,
            similarity_score: candidate.similarity,
            combined_score,
            classification,
        }
    }
}

fn sort_by_score(candidates: &mut [Candidate], score: impl Fn(&Candidate) -> f64) {
    candidates.sort_by(|a, b| {
        score(b)
            .total_cmp(&score(a))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}
