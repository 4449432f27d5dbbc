use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::Embedder;
use crate::cache::EmbeddingCache;

#[derive(Clone)]
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    cache: Option<Arc<EmbeddingCache>>,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            retry: RetryPolicy::none(),
            cache: None,
        }
    }

    pub fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "all-minilm".to_string(),
        )
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Generate embedding for text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(text) {
                return Ok(hit);
            }
        }

        let embedding = self.retry
            .retry("ollama_embed", || self.request_embedding(text))
            .await?;

        if let Some(cache) = &self.cache {
            cache.set(text, embedding.clone());
        }

        Ok(embedding)
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding request failed: {}", response.status());
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        Ok(embedding_response.embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, phrases: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(phrases.len());

        for phrase in phrases {
            let vector = self.embed_text(phrase)
                .await
                .with_context(|| format!("Failed to embed phrase {:?}", phrase))?;
            vectors.push(vector);
        }

        if let Some(cache) = &self.cache {
            let stats = cache.stats();
            debug!(phrases = phrases.len(), cached = stats.embeddings_cached, "Embedded phrases");
        }

        Ok(vectors)
    }
}
