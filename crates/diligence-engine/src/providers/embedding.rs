use async_trait::async_trait;

use super::ProviderError;
use crate::text::{content_tokens, fnv1a};

/// Text → fixed-dimension vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn name(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Local feature-hashing embedder.
///
/// Hashes content tokens and adjacent token pairs into fixed buckets, weighted by
/// frequency, then L2-normalizes. Deterministic and always available, so it backs
/// deployments without an embedding endpoint.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(term: &str, dims: usize) -> usize {
        (fnv1a(term.as_bytes()) % dims as u64) as usize
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let ordered: Vec<String> = text
            .to_lowercase()
            .split(|ch: char| !ch.is_alphanumeric() && ch != '+' && ch != '#')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        let vocabulary = content_tokens(text);

        for token in ordered.iter().filter(|token| vocabulary.contains(*token)) {
            vector[Self::bucket(token, self.dimensions)] += 1.0;
        }
        for pair in ordered.windows(2) {
            if vocabulary.contains(&pair[0]) && vocabulary.contains(&pair[1]) {
                let bigram = format!("{} {}", pair[0], pair[1]);
                vector[Self::bucket(&bigram, self.dimensions)] += 0.5;
            }
        }

        let norm: f32 = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-embedder"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.vectorize(text))
    }
}
