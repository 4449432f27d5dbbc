use clustering::LlmLabeler;
use embeddings::{EmbeddingCache, EmbeddingClient};
use extract::{LlmTopicExtractor, OllamaClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::stages::ReviewPipelineServices;

impl ReviewPipelineServices {
    /// Ollama-backed collaborators as described by the config.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let ollama = &config.ollama;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ollama.request_timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config {
                message: format!("cannot build HTTP client: {}", e),
            })?;
        let retry = config.retry_policy();

        let extraction_client = OllamaClient::new(ollama.base_url.clone(), ollama.extraction_model.clone())
            .with_http_client(http.clone())
            .with_retry(retry.clone());
        let labeling_client = OllamaClient::new(ollama.base_url.clone(), ollama.labeling_model.clone())
            .with_http_client(http.clone())
            .with_retry(retry.clone());

        info!(
            base_url = %ollama.base_url,
            extraction_model = %extraction_client.model(),
            labeling_model = %labeling_client.model(),
            embedding_model = %ollama.embedding_model,
            max_retries = retry.max_retries(),
            cache = config.cache.enabled,
            "Configured Ollama collaborators"
        );

        let extractor = LlmTopicExtractor::new(extraction_client)
            .with_max_corrections(ollama.max_json_corrections);

        let mut embedder = EmbeddingClient::new(ollama.base_url.clone(), ollama.embedding_model.clone())
            .with_http_client(http)
            .with_retry(retry);
        if config.cache.enabled {
            embedder = embedder.with_cache(Arc::new(EmbeddingCache::new(config.cache.max_entries)));
        }

        Ok(Self {
            extractor: Arc::new(extractor),
            embedder: Arc::new(embedder),
            labeler: Arc::new(LlmLabeler::new(labeling_client)),
            cluster_params: config.clustering,
        })
    }
}
