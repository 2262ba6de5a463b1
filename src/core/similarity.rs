//! Semantic similarity capability and the embedding-backed adapter
//!
//! The engine only depends on [`SimilarityProvider`]. Anything that can turn
//! text into a vector ([`TextEmbedder`]) becomes a provider through
//! [`EmbeddingSimilarity`], which memoises one embedding per distinct text.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::error::SimilarityError;

/// Meaning-level closeness of two texts, in [0, 1]
///
/// Implementations must be safe to call concurrently and deterministic for a
/// fixed pair of texts.
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, SimilarityError>;
}

#[async_trait]
impl<P: SimilarityProvider + ?Sized> SimilarityProvider for Arc<P> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, SimilarityError> {
        (**self).similarity(text_a, text_b).await
    }
}

/// Text embedding model
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SimilarityError>;
}

/// Cosine similarity between two vectors of equal length
///
/// Accumulates in f64; a zero-norm vector yields 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// [`SimilarityProvider`] over any [`TextEmbedder`]
///
/// Embeddings are cached per text, so a cross-product of `m x n` pairs costs
/// at most `m + n` embedding calls per text field. Concurrent requests for the
/// same uncached text are coalesced into one call.
pub struct EmbeddingSimilarity<E> {
    embedder: Arc<E>,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl<E: TextEmbedder + 'static> EmbeddingSimilarity<E> {
    pub fn new(embedder: E, cache_capacity: u64) -> Self {
        Self {
            embedder: Arc::new(embedder),
            cache: Cache::builder().max_capacity(cache_capacity).build(),
        }
    }

    async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>, SimilarityError> {
        let embedder = Arc::clone(&self.embedder);
        let owned = text.to_string();

        self.cache
            .try_get_with(text.to_string(), async move {
                debug!("Embedding text ({} chars)", owned.len());
                embedder.embed(&owned).await.map(Arc::new)
            })
            .await
            .map_err(|shared| {
                Arc::try_unwrap(shared)
                    .unwrap_or_else(|shared| SimilarityError::Backend(shared.to_string()))
            })
    }

    /// Number of distinct texts currently memoised
    pub async fn cached_embeddings(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[async_trait]
impl<E: TextEmbedder + 'static> SimilarityProvider for EmbeddingSimilarity<E> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, SimilarityError> {
        if text_a.trim().is_empty() || text_b.trim().is_empty() {
            return Ok(0.0);
        }

        let a = self.embedding(text_a).await?;
        let b = self.embedding(text_b).await?;

        if a.len() != b.len() {
            return Err(SimilarityError::DimensionMismatch {
                left: a.len(),
                right: b.len(),
            });
        }

        Ok(cosine_similarity(&a, &b).clamp(0.0, 1.0))
    }
}

/// Bounds the latency of every call to the wrapped provider
///
/// The wrapped call runs on its own task, so a provider that blocks its
/// thread without yielding is still cut off once the deadline passes (on a
/// multi-threaded runtime). The abandoned call is aborted at its next yield
/// point and its result discarded.
pub struct TimeoutSimilarity<P> {
    inner: Arc<P>,
    timeout: Duration,
}

impl<P: SimilarityProvider + 'static> TimeoutSimilarity<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }
}

#[async_trait]
impl<P: SimilarityProvider + 'static> SimilarityProvider for TimeoutSimilarity<P> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, SimilarityError> {
        let inner = Arc::clone(&self.inner);
        let (a, b) = (text_a.to_string(), text_b.to_string());
        let mut call = tokio::spawn(async move { inner.similarity(&a, &b).await });

        match tokio::time::timeout(self.timeout, &mut call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(SimilarityError::Backend(format!("similarity task failed: {}", e))),
            Err(_) => {
                call.abort();
                Err(SimilarityError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}
