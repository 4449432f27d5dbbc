use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stand-in date for reviews that arrive without one. Never parses as a day.
pub const UNKNOWN_DATE: &str = "unknown";

/// A single user review as it arrived in the batch.
///
/// Fields other than `text` and `date` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Review {
    pub fn new(text: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date: Some(date.into()),
            extra: Map::new(),
        }
    }

    /// The raw date string, or `"unknown"` when the review had none.
    pub fn date_or_unknown(&self) -> &str {
        self.date.as_deref().unwrap_or(UNKNOWN_DATE)
    }
}
