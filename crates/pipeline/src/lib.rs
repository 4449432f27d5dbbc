pub mod config;
pub mod error;
pub mod graph;
pub mod services;
pub mod stages;
pub mod state;

pub use config::{OperationMode, PipelineConfig};
pub use error::PipelineError;
pub use graph::{CompiledGraph, Stage, StateGraph};
pub use stages::{ReviewPipelineServices, build_review_pipeline, map_observations};
pub use state::{PipelineState, parse_run_date};
