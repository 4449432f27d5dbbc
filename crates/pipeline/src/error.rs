use clustering::ClusterError;
use thiserror::Error;
use trends::TrendError;

/// Why a pipeline run, or one of its stages, failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or empty input to a stage. Fatal to the run.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A collaborator (extraction, embedding) call failed.
    #[error("{service} service failed: {source:#}")]
    UpstreamServiceFailure {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A stage failed; the run produced no output.
    #[error("Run aborted in stage '{stage}': {source}")]
    AbortedRun {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Invalid stage graph: {reason}")]
    Graph { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Report(#[from] TrendError),
}

impl PipelineError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn upstream(service: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| PipelineError::UpstreamServiceFailure { service, source }
    }

    /// The innermost error of an aborted run, or `self`.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::AbortedRun { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<ClusterError> for PipelineError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::InvalidInput { reason } => PipelineError::InvalidInput { reason },
        }
    }
}
