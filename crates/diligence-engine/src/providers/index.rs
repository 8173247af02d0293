use std::collections::BTreeSet;
use std::sync::RwLock;

use super::cosine_similarity;
use crate::segmentation::EvidenceChunk;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("chunk {chunk} has {actual} dimensions, index holds {expected}")]
    DimensionMismatch {
        chunk: String,
        expected: usize,
        actual: usize,
    },
    #[error("chunk index lock poisoned")]
    Poisoned,
}

/// Chunk paired with its cosine similarity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub chunk: EvidenceChunk,
    pub similarity: f64,
}

/// Store of evidence chunks searchable by embedding.
///
/// `append` is atomic: either every chunk in the batch becomes visible or none does.
/// Chunks for an evidence item already in the index are superseded by the new batch.
pub trait VectorIndex: Send + Sync {
    fn append(&self, chunks: Vec<EvidenceChunk>) -> Result<usize, IndexError>;
    /// Top `k` embedded chunks by similarity, ties broken by chunk id.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>, IndexError>;
    fn chunks(&self) -> Result<Vec<EvidenceChunk>, IndexError>;
    fn len(&self) -> Result<usize, IndexError>;

    fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }
}

#[derive(Default)]
struct IndexState {
    chunks: Vec<EvidenceChunk>,
    dimensions: Option<usize>,
}

#[derive(Default)]
pub struct InMemoryChunkIndex {
    state: RwLock<IndexState>,
}

impl InMemoryChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryChunkIndex {
    fn append(&self, chunks: Vec<EvidenceChunk>) -> Result<usize, IndexError> {
        let mut state = self.state.write().map_err(|_| IndexError::Poisoned)?;

        let mut dimensions = state.dimensions;
        for chunk in &chunks {
            if let Some(embedding) = &chunk.embedding {
                match dimensions {
                    Some(expected) if expected != embedding.len() => {
                        return Err(IndexError::DimensionMismatch {
                            chunk: chunk.id.clone(),
                            expected,
                            actual: embedding.len(),
                        });
                    }
                    _ => dimensions = Some(embedding.len()),
                }
            }
        }

        let superseded: BTreeSet<&str> = chunks
            .iter()
            .map(|chunk| chunk.evidence_item_id.0.as_str())
            .collect();
        state
            .chunks
            .retain(|existing| !superseded.contains(existing.evidence_item_id.0.as_str()));

        let added = chunks.len();
        state.chunks.extend(chunks);
        state.dimensions = dimensions;
        Ok(added)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;
        if let Some(expected) = state.dimensions {
            if expected != query.len() {
                return Err(IndexError::DimensionMismatch {
                    chunk: "query".to_string(),
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut hits: Vec<ChunkHit> = state
            .chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_deref()?;
                let similarity = cosine_similarity(query, embedding).unwrap_or(0.0);
                Some(ChunkHit {
                    chunk: chunk.clone(),
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn chunks(&self) -> Result<Vec<EvidenceChunk>, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;
        Ok(state.chunks.clone())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;
        Ok(state.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{EvidenceCategory, EvidenceId, SourceType};

    fn chunk(item: &str, index: usize, embedding: Option<Vec<f32>>) -> EvidenceChunk {
        EvidenceChunk {
            id: format!("{item}#{index}"),
            evidence_item_id: EvidenceId(item.to_string()),
            index,
            text: format!("{item} text {index}"),
            start_offset: 0,
            end_offset: 10,
            category: EvidenceCategory::TechStack,
            source_type: SourceType::Primary,
            source_url: None,
            embedding,
        }
    }

    #[test]
    fn search_orders_by_similarity_then_id() {
        let index = InMemoryChunkIndex::new();
        index
            .append(vec![
                chunk("b", 0, Some(vec![1.0, 0.0])),
                chunk("a", 0, Some(vec![1.0, 0.0])),
                chunk("c", 0, Some(vec![0.6, 0.8])),
                chunk("d", 0, None),
            ])
            .expect("appends");

        let hits = index.search(&[1.0, 0.0], 10).expect("searches");
        let ids: Vec<&str> = hits.iter().map(|hit| hit.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a#0", "b#0", "c#0"]);
        assert!((hits[2].similarity - 0.6).abs() < 1e-6);

        assert_eq!(index.search(&[1.0, 0.0], 1).expect("searches").len(), 1);
    }

    #[test]
    fn mismatched_dimensions_reject_the_whole_batch() {
        let index = InMemoryChunkIndex::new();
        index
            .append(vec![chunk("a", 0, Some(vec![1.0, 0.0]))])
            .expect("appends");

        let err = index
            .append(vec![
                chunk("b", 0, Some(vec![1.0, 0.0])),
                chunk("b", 1, Some(vec![1.0, 0.0, 0.0])),
            ])
            .expect_err("dimension mismatch");
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(index.len().expect("reads"), 1);
    }

    #[test]
    fn reingesting_an_item_supersedes_its_chunks() {
        let index = InMemoryChunkIndex::new();
        index
            .append(vec![chunk("a", 0, None), chunk("a", 1, None)])
            .expect("appends");
        index.append(vec![chunk("a", 0, None)]).expect("appends");

        assert_eq!(index.len().expect("reads"), 1);
        assert_eq!(index.chunks().expect("reads")[0].id, "a#0");
    }
}
