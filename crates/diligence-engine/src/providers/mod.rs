//! Contracts for the external services the engine depends on, plus local implementations.
//!
//! Every service here is optional at runtime: callers absorb [`ProviderError`]s and fall back
//! to degraded strategies instead of failing a scoring or citation run.

mod embedding;
mod http;
mod index;
mod rerank;

use std::future::Future;
use std::time::Duration;

pub use embedding::{EmbeddingService, HashingEmbedder};
pub use http::{HttpEmbeddingService, HttpRerankService};
pub use index::{ChunkHit, InMemoryChunkIndex, IndexError, VectorIndex};
pub use rerank::{OverlapReranker, RerankService};

/// Failure talking to an embedding or reranking service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },
    #[error("{provider} timed out after {after_ms}ms")]
    Timeout { provider: String, after_ms: u64 },
    #[error("{provider} returned {actual} values, expected {expected}")]
    ShapeMismatch {
        provider: String,
        expected: usize,
        actual: usize,
    },
}

/// Runs a service call under a deadline, mapping elapsed deadlines to [`ProviderError::Timeout`].
pub async fn with_timeout<T, F>(provider: &str, timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider: provider.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Cosine similarity clamped to [0, 1]; `None` when shapes differ or a vector is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return None;
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    cosine.is_finite().then(|| cosine.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let result: Result<(), ProviderError> =
            with_timeout("slow", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(
            result,
            Err(ProviderError::Timeout {
                provider: "slow".to_string(),
                after_ms: 10
            })
        );
    }
}
