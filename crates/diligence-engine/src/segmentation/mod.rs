//! Evidence segmentation and embedding ahead of citation retrieval.

mod chunker;

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::providers::{with_timeout, EmbeddingService, ProviderError};
use crate::scoring::EvidenceItem;
pub use chunker::{segment_item, split_spans, EvidenceChunk};

/// Chunks produced for one ingestion batch, embedded where the embedding service allowed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SegmentationOutcome {
    pub chunks: Vec<EvidenceChunk>,
    pub embedded: usize,
    pub unembedded: usize,
    pub failures: Vec<String>,
}

impl SegmentationOutcome {
    /// True when at least one chunk must fall back to lexical retrieval.
    pub fn degraded(&self) -> bool {
        self.unembedded > 0
    }
}

/// Segments evidence items and embeds the resulting chunks with bounded concurrency.
pub struct SegmentationPipeline {
    embedder: Arc<dyn EmbeddingService>,
    max_chunk_chars: usize,
    concurrency: usize,
    timeout: Duration,
}

impl SegmentationPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        max_chunk_chars: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            max_chunk_chars: max_chunk_chars.max(1),
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingService> {
        &self.embedder
    }

    pub async fn process(&self, items: &[EvidenceItem]) -> SegmentationOutcome {
        let chunks: Vec<EvidenceChunk> = items
            .iter()
            .flat_map(|item| segment_item(item, self.max_chunk_chars))
            .collect();

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings: Vec<Result<Vec<f32>, ProviderError>> = stream::iter(texts)
            .map(|text| async move { self.embed(&text).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = SegmentationOutcome::default();
        for (mut chunk, embedding) in chunks.into_iter().zip(embeddings) {
            match embedding {
                Ok(vector) => {
                    chunk.embedding = Some(vector);
                    outcome.embedded += 1;
                }
                Err(err) => {
                    warn!(chunk = %chunk.id, error = %err, "chunk left unembedded");
                    outcome.unembedded += 1;
                    outcome.failures.push(format!("{}: {}", chunk.id, err));
                }
            }
            outcome.chunks.push(chunk);
        }

        debug!(
            items = items.len(),
            chunks = outcome.chunks.len(),
            embedded = outcome.embedded,
            unembedded = outcome.unembedded,
            "segmented evidence batch"
        );
        outcome
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let provider = self.embedder.name().to_string();
        let vector = with_timeout(&provider, self.timeout, self.embedder.embed(text)).await?;
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
}
