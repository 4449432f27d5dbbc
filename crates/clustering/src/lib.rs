pub mod agglomerative;
pub mod canonicalize;
pub mod prompt;

pub use agglomerative::{AgglomerativeClusterer, ClusterParams, DistanceMetric, Linkage, group_by_label};
pub use canonicalize::{
    CanonicalTopic, Canonicalizer, LabelOutcome, LabelRecord, Labeler, LlmLabeler, TopicType,
    decode_label_response, uncovered_members,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Invalid clustering input: {reason}")]
    InvalidInput { reason: String },
}

impl ClusterError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ClusterError::InvalidInput {
            reason: reason.into(),
        }
    }
}
