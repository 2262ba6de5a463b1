use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::error::SimilarityError;
use crate::core::similarity::TextEmbedder;

/// Errors that can occur when talking to a remote embedding model
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<EmbeddingClientError> for SimilarityError {
    fn from(value: EmbeddingClientError) -> Self {
        SimilarityError::Backend(value.to_string())
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
pub struct HttpEmbeddingClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            model,
            api_key,
            client,
        })
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));

        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(EmbeddingClientError::ApiError(format!(
                "Embedding request failed: {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingClientError::InvalidResponse(e.to_string()))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingClientError::InvalidResponse("No embeddings returned".into()))?;

        tracing::trace!("Embedded {} chars into {} dims", text.len(), embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl TextEmbedder for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SimilarityError> {
        Ok(self.embed_text(text).await?)
    }
}

/// Offline bag-of-words embedder
///
/// Lower-cased alphanumeric tokens are hashed (FNV-1a) into a fixed number of
/// term-frequency buckets. Deterministic across runs and processes, so texts
/// sharing vocabulary score high and disjoint texts score 0.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl LexicalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl TextEmbedder for LexicalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SimilarityError> {
        let embedder = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embedder.vectorize(&text))
            .await
            .map_err(|e| SimilarityError::Backend(format!("lexical embedding task failed: {}", e)))
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
