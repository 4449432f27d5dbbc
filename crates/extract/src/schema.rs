use ingest::Review;
use serde::{Deserialize, Serialize};

use crate::SENTINEL_TOPIC;

/// Structured output expected from the extraction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicOutput {
    pub topics: Vec<String>,
}

/// A review together with the topic phrases found in it.
///
/// `topics` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReview {
    #[serde(flatten)]
    pub review: Review,
    pub topics: Vec<String>,
}

impl ExtractedReview {
    /// Attach topics to a review, dropping blank phrases and falling back to
    /// the sentinel topic when nothing is left.
    pub fn new(review: Review, topics: Vec<String>) -> Self {
        let mut topics: Vec<String> = topics
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();

        if topics.is_empty() {
            topics.push(SENTINEL_TOPIC.to_string());
        }

        Self { review, topics }
    }

    pub fn mentions(&self, phrase: &str) -> bool {
        self.topics.iter().any(|t| t == phrase)
    }
}
