//! HTTP clients for remote embedding and reranking endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingService, ProviderError, RerankService};

fn unavailable(provider: &str, reason: impl ToString) -> ProviderError {
    ProviderError::Unavailable {
        provider: provider.to_string(),
        reason: reason.to_string(),
    }
}

fn client(timeout: Duration, provider: &str) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| unavailable(provider, format!("client setup failed: {err}")))
}

async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    body: &Req,
) -> Result<Resp, ProviderError>
where
    Req: Serialize + ?Sized,
    Resp: for<'de> Deserialize<'de>,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|err| unavailable(provider, format!("request failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(unavailable(provider, format!("returned {status}: {body}")));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|err| unavailable(provider, format!("malformed response: {err}")))
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Single { embedding: Vec<f32> },
    Batch { data: Vec<EmbedDatum> },
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

/// Embedding endpoint accepting `{"input": ...}` and answering with either
/// `{"embedding": [...]}` or `{"data": [{"embedding": [...]}]}`.
pub struct HttpEmbeddingService {
    client: reqwest::Client,
    url: String,
    model: Option<String>,
    dimensions: usize,
}

impl HttpEmbeddingService {
    pub fn new(
        url: impl Into<String>,
        model: Option<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: client(timeout, "embedding-service")?,
            url: url.into(),
            model,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    fn name(&self) -> &str {
        "embedding-service"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbedRequest {
            input: text,
            model: self.model.as_deref(),
        };
        let response: EmbedResponse =
            post_json(&self.client, self.name(), &self.url, &request).await?;
        let embedding = match response {
            EmbedResponse::Single { embedding } => embedding,
            EmbedResponse::Batch { data } => data
                .into_iter()
                .next()
                .map(|datum| datum.embedding)
                .ok_or_else(|| unavailable(self.name(), "empty embedding batch"))?,
        };
        debug!(dimensions = embedding.len(), "embedded text remotely");
        Ok(embedding)
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RerankResponse {
    Indexed { results: Vec<RerankResult> },
    Ordered { scores: Vec<f64> },
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f64,
}

/// Cross-encoder endpoint accepting `{"query", "documents"}` and answering with either
/// `{"results": [{"index", "relevance_score"}]}` or `{"scores": [...]}`.
pub struct HttpRerankService {
    client: reqwest::Client,
    url: String,
    model: Option<String>,
}

impl HttpRerankService {
    pub fn new(
        url: impl Into<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: client(timeout, "rerank-service")?,
            url: url.into(),
            model,
        })
    }
}

#[async_trait]
impl RerankService for HttpRerankService {
    fn name(&self) -> &str {
        "rerank-service"
    }

    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f64>, ProviderError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let request = RerankRequest {
            query,
            documents: candidates,
            model: self.model.as_deref(),
        };
        let response: RerankResponse =
            post_json(&self.client, self.name(), &self.url, &request).await?;

        let scores = match response {
            RerankResponse::Ordered { scores } => scores,
            RerankResponse::Indexed { results } => {
                let mut scores = vec![0.0; candidates.len()];
                for result in results {
                    let slot = scores.get_mut(result.index).ok_or_else(|| {
                        unavailable(self.name(), format!("result index {} out of range", result.index))
                    })?;
                    *slot = result.relevance_score;
                }
                scores
            }
        };

        if scores.len() != candidates.len() {
            return Err(ProviderError::ShapeMismatch {
                provider: self.name().to_string(),
                expected: candidates.len(),
                actual: scores.len(),
            });
        }
        Ok(scores
            .into_iter()
            .map(|score| if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_embedding_response_shapes_parse() {
        let single: EmbedResponse =
            serde_json::from_str(r#"{"embedding": [0.1, 0.2]}"#).expect("parses");
        assert!(matches!(single, EmbedResponse::Single { ref embedding } if embedding.len() == 2));

        let batch: EmbedResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#).expect("parses");
        assert!(matches!(batch, EmbedResponse::Batch { ref data } if data[0].embedding.len() == 3));
    }

    #[test]
    fn both_rerank_response_shapes_parse() {
        let indexed: RerankResponse = serde_json::from_str(
            r#"{"results": [{"index": 1, "relevance_score": 0.94}, {"index": 0, "relevance_score": 0.6}]}"#,
        )
        .expect("parses");
        assert!(matches!(indexed, RerankResponse::Indexed { ref results } if results.len() == 2));

        let ordered: RerankResponse =
            serde_json::from_str(r#"{"scores": [0.2, 0.9]}"#).expect("parses");
        assert!(matches!(ordered, RerankResponse::Ordered { ref scores } if scores == &vec![0.2, 0.9]));
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_unavailable() {
        let service = HttpEmbeddingService::new(
            "http://127.0.0.1:9/embed",
            None,
            8,
            Duration::from_millis(200),
        )
        .expect("client builds");
        let err = service.embed("Kubernetes").await.expect_err("nothing listens on port 9");
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }
}
