pub mod llm;
pub mod prompt;
pub mod retry;
pub mod schema;

pub use llm::OllamaClient;
pub use retry::RetryPolicy;
pub use schema::{ExtractedReview, TopicOutput};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Topic used for reviews the extractor found nothing in.
pub const SENTINEL_TOPIC: &str = "feedback";

/// Turns review text into a list of topic phrases.
///
/// An empty list is a valid answer; callers apply the sentinel.
#[async_trait]
pub trait TopicExtractor: Send + Sync {
    async fn extract(&self, review_text: &str) -> Result<Vec<String>>;
}

/// Extractor backed by an Ollama model.
pub struct LlmTopicExtractor {
    llm_client: OllamaClient,
    max_corrections: usize,
}

impl LlmTopicExtractor {
    pub fn new(llm_client: OllamaClient) -> Self {
        Self {
            llm_client,
            max_corrections: 2,
        }
    }

    pub fn with_max_corrections(mut self, max_corrections: usize) -> Self {
        self.max_corrections = max_corrections;
        self
    }
}

#[async_trait]
impl TopicExtractor for LlmTopicExtractor {
    async fn extract(&self, review_text: &str) -> Result<Vec<String>> {
        let prompt = prompt::build_extraction_prompt(review_text);

        let json_str = self.llm_client
            .generate_json(&prompt, self.max_corrections)
            .await
            .context("Failed to extract topics")?;

        Ok(json_str.as_deref().map(parse_topics).unwrap_or_default())
    }
}

/// Decode `{"topics": [...]}`; anything else counts as no topics.
pub fn parse_topics(raw: &str) -> Vec<String> {
    match serde_json::from_str::<TopicOutput>(raw) {
        Ok(output) => output.topics,
        Err(e) => {
            debug!(error = %e, "Extraction output did not match schema");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topics() {
        assert_eq!(
            parse_topics(r#"{"topics": ["app crashes", "login bug"]}"#),
            vec!["app crashes".to_string(), "login bug".to_string()]
        );
    }

    #[test]
    fn test_parse_topics_wrong_shape_is_empty() {
        assert!(parse_topics(r#"{"entities": []}"#).is_empty());
        assert!(parse_topics(r#"["app crashes"]"#).is_empty());
        assert!(parse_topics("not json").is_empty());
    }
}
