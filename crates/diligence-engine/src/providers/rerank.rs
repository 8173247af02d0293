use async_trait::async_trait;

use super::ProviderError;
use crate::text::{content_tokens, coverage};

/// Scores candidate passages against a query.
///
/// Returns one relevance value in [0, 1] per candidate, in candidate order.
#[async_trait]
pub trait RerankService: Send + Sync {
    fn name(&self) -> &str;
    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f64>, ProviderError>;
}

/// Local reranker scoring passages by how much of the query they cover.
///
/// A passage covering every query term scores 1.0; bigram overlap breaks ties between
/// passages covering the same terms.
#[derive(Debug, Clone, Default)]
pub struct OverlapReranker;

impl OverlapReranker {
    fn relevance(query: &str, candidate: &str) -> f64 {
        let query_tokens = content_tokens(query);
        let candidate_tokens = content_tokens(candidate);
        if query_tokens.is_empty() || candidate_tokens.is_empty() {
            return 0.0;
        }

        let term_coverage = coverage(&query_tokens, &candidate_tokens);
        let query_pairs = bigrams(query);
        let phrase_bonus = if query_pairs.is_empty() {
            0.0
        } else {
            let candidate_pairs = bigrams(candidate);
            let shared = query_pairs
                .iter()
                .filter(|pair| candidate_pairs.contains(pair))
                .count();
            shared as f64 / query_pairs.len() as f64
        };

        (0.85 * term_coverage + 0.15 * phrase_bonus).clamp(0.0, 1.0)
    }
}

fn bigrams(text: &str) -> Vec<(String, String)> {
    let tokens = content_tokens(text);
    let ordered: Vec<String> = text
        .to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric() && ch != '+' && ch != '#')
        .filter(|token| tokens.contains(*token))
        .map(str::to_string)
        .collect();
    ordered
        .windows(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

#[async_trait]
impl RerankService for OverlapReranker {
    fn name(&self) -> &str {
        "overlap-reranker"
    }

    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f64>, ProviderError> {
        Ok(candidates
            .iter()
            .map(|candidate| Self::relevance(query, candidate))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_coverage_outranks_partial_coverage() {
        let scores = OverlapReranker
            .rerank(
                "Kubernetes clusters autoscale",
                &[
                    "Our Kubernetes clusters autoscale nightly.".to_string(),
                    "Kubernetes is on the roadmap.".to_string(),
                    "Revenue grew 40%.".to_string(),
                ],
            )
            .await
            .expect("reranks");

        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[2], 0.0);
    }

    #[tokio::test]
    async fn empty_query_scores_nothing() {
        let scores = OverlapReranker
            .rerank("the and", &["Kubernetes".to_string()])
            .await
            .expect("reranks");
        assert_eq!(scores, vec![0.0]);
    }
}
