// Knowledge base: embedded reference-document chunks and similarity search.
// Built by POST /upload, searched by the profiling stage of an analysis run.

pub mod archive;
pub mod embedder;
pub mod handlers;
pub mod splitter;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::knowledge::embedder::{EmbedError, Embedder};

/// Separator placed between chunks returned by a search.
pub const SEARCH_SEPARATOR: &str = "\n---\n";

/// An immutable, fully built knowledge base.
#[derive(Debug)]
pub struct KnowledgeBase {
    pub id: Uuid,
    pub built_at: DateTime<Utc>,
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl KnowledgeBase {
    /// Embeds every chunk and assembles the base. Nothing is shared until this returns.
    pub async fn build(chunks: Vec<String>, embedder: &dyn Embedder) -> Result<Self, EmbedError> {
        let vectors = embedder.embed_documents(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbedError::CountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            chunks,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the `k` chunks most similar to `query_vector`, best first.
    /// Ties keep document order.
    pub fn nearest(&self, query_vector: &[f32], k: usize) -> Vec<&str> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query_vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.chunks[i].as_str())
            .collect()
    }

    /// Embeds `query` and returns the top-k chunks joined with `SEARCH_SEPARATOR`.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<String, EmbedError> {
        let query_vector = embedder.embed_query(query).await?;
        Ok(self.nearest(&query_vector, k).join(SEARCH_SEPARATOR))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Process-wide slot holding the current knowledge base.
///
/// Empty at startup. Builds are serialized by `build_lock` and the finished base
/// is swapped in whole, so readers see either the previous base or the new one,
/// never a partial build. Readers hold an `Arc` snapshot for as long as they need it.
#[derive(Clone, Default)]
pub struct KnowledgeBaseHandle {
    current: Arc<RwLock<Option<Arc<KnowledgeBase>>>>,
    build_lock: Arc<Mutex<()>>,
}

impl KnowledgeBaseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot, or a configuration error before the first build.
    pub async fn current(&self) -> Result<Arc<KnowledgeBase>, AppError> {
        self.current.read().await.clone().ok_or_else(|| {
            AppError::Configuration("Knowledge base is not initialized.".to_string())
        })
    }

    /// Builds a new base from `chunks` and replaces the current one.
    pub async fn rebuild(
        &self,
        chunks: Vec<String>,
        embedder: &dyn Embedder,
    ) -> Result<Arc<KnowledgeBase>, AppError> {
        let _guard = self.build_lock.lock().await;

        let base = KnowledgeBase::build(chunks, embedder)
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))?;
        let base = Arc::new(base);

        *self.current.write().await = Some(base.clone());
        info!(
            "Knowledge base {} ready: {} chunks (embedder: {})",
            base.id,
            base.len(),
            embedder.name()
        );
        Ok(base)
    }
}
