use chrono::NaiveDate;
use clustering::CanonicalTopic;
use extract::ExtractedReview;
use ingest::Review;
use std::path::PathBuf;
use trends::{AggregateSummary, MappedObservation, TrendTable};

use crate::error::PipelineError;

/// Everything one run reads and produces, stage by stage.
///
/// Inputs are set at construction; each stage fills in its own fields.
/// `phrases`, `vectors` and `labels` are index-aligned: position `i` of each
/// describes the same topic mention.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub reviews: Vec<Review>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub output: PathBuf,

    // extract
    pub extracted: Vec<ExtractedReview>,
    // embed
    pub phrases: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    // cluster
    pub labels: Vec<usize>,
    // canonical
    pub canonical: Vec<CanonicalTopic>,
    // aggregate
    pub observations: Vec<MappedObservation>,
    pub table: Option<TrendTable>,
    pub summary: Option<AggregateSummary>,
}

impl PipelineState {
    pub fn new(
        reviews: Vec<Review>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reviews,
            start_date,
            end_date,
            output: output.into(),
            extracted: Vec::new(),
            phrases: Vec::new(),
            vectors: Vec::new(),
            labels: Vec::new(),
            canonical: Vec::new(),
            observations: Vec::new(),
            table: None,
            summary: None,
        }
    }
}

/// Parse a run-level `YYYY-MM-DD` date.
pub fn parse_run_date(raw: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| PipelineError::invalid(format!("run date {:?} is not YYYY-MM-DD: {}", raw, e)))
}
