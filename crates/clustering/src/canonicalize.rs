use anyhow::Result;
use async_trait::async_trait;
use extract::OllamaClient;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::prompt;

/// Label used when the labeling service gives nothing usable.
pub const FALLBACK_LABEL: &str = "unknown";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    Issue,
    Request,
    #[default]
    Feedback,
}

impl fmt::Display for TopicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopicType::Issue => "issue",
            TopicType::Request => "request",
            TopicType::Feedback => "feedback",
        };
        f.write_str(name)
    }
}

/// The canonical identity given to one cluster of phrases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTopic {
    pub cluster: usize,
    pub canonical_label: String,
    pub synonyms: Vec<String>,
    pub topic_type: TopicType,
}

impl CanonicalTopic {
    /// The record used when labeling fails outright.
    pub fn fallback(cluster: usize, phrases: &[String]) -> Self {
        Self {
            cluster,
            canonical_label: FALLBACK_LABEL.to_string(),
            synonyms: phrases.to_vec(),
            topic_type: TopicType::Feedback,
        }
    }
}

/// Fields the labeling model is asked for. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelRecord {
    #[serde(default)]
    pub canonical_label: Option<String>,
    #[serde(default)]
    pub synonyms: Option<Vec<String>>,
    #[serde(default)]
    pub topic_type: Option<TopicType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelOutcome {
    Parsed(LabelRecord),
    Unparsable,
}

/// Decode a raw labeling response. A surrounding Markdown code fence is
/// ignored; the rest must be a JSON object with correctly typed fields.
pub fn decode_label_response(raw: &str) -> LabelOutcome {
    let body = match CODE_FENCE.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw.trim(),
    };

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => match serde_json::from_value(value) {
            Ok(record) => LabelOutcome::Parsed(record),
            Err(e) => {
                debug!(error = %e, "Label record has malformed fields");
                LabelOutcome::Unparsable
            }
        },
        Ok(_) => LabelOutcome::Unparsable,
        Err(e) => {
            debug!(error = %e, "Label response is not JSON");
            LabelOutcome::Unparsable
        }
    }
}

/// Produces a raw (ideally JSON) labeling response for a cluster's phrases.
#[async_trait]
pub trait Labeler: Send + Sync {
    async fn label(&self, phrases: &[String]) -> Result<String>;
}

/// Labeler backed by an Ollama model.
pub struct LlmLabeler {
    llm_client: OllamaClient,
}

impl LlmLabeler {
    pub fn new(llm_client: OllamaClient) -> Self {
        Self { llm_client }
    }
}

#[async_trait]
impl Labeler for LlmLabeler {
    async fn label(&self, phrases: &[String]) -> Result<String> {
        let prompt = prompt::build_label_prompt(phrases);
        self.llm_client.generate(&prompt).await
    }
}

/// Gives every cluster a canonical label, never failing.
#[derive(Clone)]
pub struct Canonicalizer {
    labeler: Arc<dyn Labeler>,
}

impl Canonicalizer {
    pub fn new(labeler: Arc<dyn Labeler>) -> Self {
        Self { labeler }
    }

    pub async fn canonicalize(&self, cluster: usize, phrases: &[String]) -> CanonicalTopic {
        if phrases.is_empty() {
            return CanonicalTopic::fallback(cluster, phrases);
        }

        let raw = match self.labeler.label(phrases).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cluster, phrases = phrases.len(), error = %e, "Labeling service failed, using fallback label");
                return CanonicalTopic::fallback(cluster, phrases);
            }
        };

        match decode_label_response(&raw) {
            LabelOutcome::Parsed(record) => Self::complete(cluster, phrases, record),
            LabelOutcome::Unparsable => {
                warn!(cluster, response = %raw, "Unparsable labeling response, using fallback label");
                CanonicalTopic::fallback(cluster, phrases)
            }
        }
    }

    fn complete(cluster: usize, phrases: &[String], record: LabelRecord) -> CanonicalTopic {
        let canonical_label = record
            .canonical_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_LABEL.to_string());

        let synonyms = record.synonyms.unwrap_or_else(|| phrases.to_vec());
        let uncovered = uncovered_members(phrases, &synonyms);
        if !uncovered.is_empty() {
            warn!(
                cluster,
                label = %canonical_label,
                uncovered = ?uncovered,
                "Labeling response synonyms miss cluster members; their reviews will not map to this topic"
            );
        }

        CanonicalTopic {
            cluster,
            canonical_label,
            synonyms,
            topic_type: record.topic_type.unwrap_or_default(),
        }
    }
}

/// Distinct member phrases with no exact match among `synonyms`, in order.
pub fn uncovered_members<'a>(phrases: &'a [String], synonyms: &[String]) -> Vec<&'a str> {
    let mut missing: Vec<&str> = Vec::new();
    for phrase in phrases {
        if !synonyms.contains(phrase) && !missing.contains(&phrase.as_str()) {
            missing.push(phrase.as_str());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedLabeler(String);

    #[async_trait]
    impl Labeler for CannedLabeler {
        async fn label(&self, _phrases: &[String]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct DownLabeler;

    #[async_trait]
    impl Labeler for DownLabeler {
        async fn label(&self, _phrases: &[String]) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    fn phrases() -> Vec<String> {
        vec!["app crashes".to_string(), "app is crashing".to_string(), "app crashes".to_string()]
    }

    async fn canonicalize_with(response: &str) -> CanonicalTopic {
        Canonicalizer::new(Arc::new(CannedLabeler(response.to_string())))
            .canonicalize(4, &phrases())
            .await
    }

    #[tokio::test]
    async fn test_well_formed_response() {
        let topic = canonicalize_with(
            r#"{"canonical_label": "App crashes", "synonyms": ["app crashes", "app is crashing"], "topic_type": "issue"}"#,
        )
        .await;

        assert_eq!(topic.cluster, 4);
        assert_eq!(topic.canonical_label, "App crashes");
        assert_eq!(topic.synonyms, vec!["app crashes", "app is crashing"]);
        assert_eq!(topic.topic_type, TopicType::Issue);
    }

    #[tokio::test]
    async fn test_missing_fields_filled_with_defaults() {
        let topic = canonicalize_with(r#"{"canonical_label": "Crashes"}"#).await;
        assert_eq!(topic.canonical_label, "Crashes");
        assert_eq!(topic.synonyms, phrases());
        assert_eq!(topic.topic_type, TopicType::Feedback);

        let topic = canonicalize_with(r#"{"topic_type": "request"}"#).await;
        assert_eq!(topic.canonical_label, FALLBACK_LABEL);
        assert_eq!(topic.topic_type, TopicType::Request);
    }

    #[tokio::test]
    async fn test_code_fenced_json_is_accepted() {
        let topic = canonicalize_with("```json\n{\"canonical_label\": \"Crashes\", \"topic_type\": \"issue\"}\n```").await;
        assert_eq!(topic.canonical_label, "Crashes");
        assert_eq!(topic.topic_type, TopicType::Issue);
    }

    #[tokio::test]
    async fn test_malformed_responses_fall_back_verbatim() {
        let malformed = [
            "",
            "   ",
            "Sure! Here is the label: crashes",
            "{\"canonical_label\": \"Crashes\"",
            "[\"app crashes\"]",
            "\"crashes\"",
            "null",
            r#"{"canonical_label": 42}"#,
            r#"{"canonical_label": "Crashes", "topic_type": "bug"}"#,
            r#"{"synonyms": "app crashes"}"#,
        ];

        for raw in malformed {
            let topic = canonicalize_with(raw).await;
            assert_eq!(topic, CanonicalTopic::fallback(4, &phrases()), "response {:?}", raw);
        }
    }

    #[tokio::test]
    async fn test_service_failure_is_absorbed() {
        let topic = Canonicalizer::new(Arc::new(DownLabeler))
            .canonicalize(1, &phrases())
            .await;

        assert_eq!(topic.canonical_label, "unknown");
        assert_eq!(topic.synonyms, phrases());
        assert_eq!(topic.topic_type, TopicType::Feedback);
    }

    #[test]
    fn test_topic_type_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&TopicType::Request).unwrap(), "\"request\"");
        assert_eq!(TopicType::Issue.to_string(), "issue");
    }

    #[test]
    fn test_uncovered_members_lists_each_missing_phrase_once() {
        let synonyms = vec!["app crashes".to_string()];
        assert_eq!(uncovered_members(&phrases(), &synonyms), vec!["app is crashing"]);
        assert_eq!(uncovered_members(&phrases(), &[]), vec!["app crashes", "app is crashing"]);
        assert!(uncovered_members(&phrases(), &phrases()).is_empty());
    }
}
