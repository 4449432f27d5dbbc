pub mod aggregator;
pub mod dates;
pub mod report;
pub mod table;

pub use aggregator::{AggregateSummary, Aggregation, TrendAggregator};
pub use dates::{day_range, format_day, parse_day};
pub use report::ReportWriter;
pub use table::TrendTable;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One mention of a canonical topic by a review on a given (raw) date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedObservation {
    pub topic: String,
    pub date: String,
}

impl MappedObservation {
    pub fn new(topic: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            date: date.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Malformed date: {raw:?}")]
    MalformedDate { raw: String },

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Csv(#[from] csv::Error),
}
