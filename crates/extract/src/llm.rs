use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompt;
use crate::retry::RetryPolicy;

/// Thin client for the Ollama `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String, // "json" for structured output
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
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

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt, retrying transport failures per the configured policy.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.retry
            .retry("ollama_generate", || self.generate_once(prompt))
            .await
    }

    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(), // Force JSON output
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    /// Generate, re-prompting with a correction request while the output is not JSON.
    ///
    /// Returns `Ok(None)` when no attempt produced valid JSON; transport errors
    /// are returned as `Err`.
    pub async fn generate_json(
        &self,
        prompt: &str,
        max_corrections: usize,
    ) -> Result<Option<String>> {
        let mut response = self.generate(prompt).await?;

        for attempt in 0..=max_corrections {
            if serde_json::from_str::<serde_json::Value>(&response).is_ok() {
                return Ok(Some(response));
            }
            if attempt == max_corrections {
                break;
            }

            debug!(model = %self.model, attempt = attempt + 1, "Invalid JSON from model, asking for a correction");
            response = self.generate(&prompt::build_retry_prompt(&response)).await?;
        }

        Ok(None)
    }
}
