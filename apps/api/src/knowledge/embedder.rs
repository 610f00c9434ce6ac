//! Embedding backends for knowledge-base chunks and search queries.
//!
//! Default: `HashingEmbedder` (pure-Rust, deterministic, no network).
//! `VoyageEmbedder` is selected at startup when `VOYAGE_API_KEY` is set.
//!
//! `AppState` holds an `Arc<dyn Embedder>`; the same backend must embed both the
//! chunks of a build and the queries searched against it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1/embeddings";
const VOYAGE_MODEL: &str = "voyage-3";
const VOYAGE_BATCH_SIZE: usize = 128;
const HASHING_DIMENSIONS: usize = 512;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embedding API returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HashingEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Signed feature hashing over lower-cased word unigrams and bigrams, L2-normalised.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: HASHING_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let bigrams = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1]));
        for feature in tokens.iter().cloned().chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed(text))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// VoyageEmbedder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct VoyageRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoyageResponse {
    data: Vec<VoyageEmbedding>,
}

#[derive(Debug, Deserialize)]
struct VoyageEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

pub struct VoyageEmbedder {
    client: Client,
    api_url: String,
    api_key: String,
}

impl VoyageEmbedder {
    pub fn new(api_key: String) -> Self {
        Self::with_url(VOYAGE_API_URL.to_string(), api_key)
    }

    pub fn with_url(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
        }
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&VoyageRequest {
                input: texts,
                model: VOYAGE_MODEL,
                input_type,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let mut body: VoyageResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: body.data.len(),
            });
        }
        body.data.sort_by_key(|e| e.index);
        Ok(body.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    fn name(&self) -> &'static str {
        "voyage"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(VOYAGE_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch, "document").await?);
            debug!("Embedded {}/{} chunks", vectors.len(), texts.len());
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()], "query").await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            expected: 1,
            got: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hashing_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Academic integrity is non-negotiable.");
        let b = embedder.embed("Academic integrity is non-negotiable.");
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let v = HashingEmbedder::default().embed("  ...  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_hashing_related_text_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("student privacy policy");
        let related = embedder.embed("Our policy protects student privacy at all times.");
        let unrelated = embedder.embed("The cafeteria opens at seven for breakfast.");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_voyage_orders_vectors_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer voyage-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = VoyageEmbedder::with_url(server.uri(), "voyage-key".to_string());
        let vectors = embedder
            .embed_documents(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_voyage_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let embedder = VoyageEmbedder::with_url(server.uri(), "nope".to_string());
        let err = embedder.embed_query("anything").await.unwrap_err();
        assert!(matches!(err, EmbedError::Api { status: 401, .. }));
    }
}
