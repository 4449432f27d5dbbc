use async_trait::async_trait;
use clustering::{AgglomerativeClusterer, CanonicalTopic, Canonicalizer, ClusterParams, Labeler, group_by_label};
use embeddings::Embedder;
use extract::{ExtractedReview, TopicExtractor};
use std::sync::Arc;
use tracing::{debug, info};
use trends::{MappedObservation, ReportWriter, TrendAggregator};

use crate::error::PipelineError;
use crate::graph::{CompiledGraph, Stage, StateGraph};
use crate::state::PipelineState;

pub const EXTRACT: &str = "extract";
pub const EMBED: &str = "embed";
pub const CLUSTER: &str = "cluster";
pub const CANONICAL: &str = "canonical";
pub const AGGREGATE: &str = "aggregate";
pub const REPORT: &str = "report";

/// Collaborators and settings the review pipeline is built from.
#[derive(Clone)]
pub struct ReviewPipelineServices {
    pub extractor: Arc<dyn TopicExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub labeler: Arc<dyn Labeler>,
    pub cluster_params: ClusterParams,
}

/// extract → embed → cluster → canonical → aggregate → report
pub fn build_review_pipeline(
    services: ReviewPipelineServices,
) -> Result<CompiledGraph<PipelineState>, PipelineError> {
    let mut graph = StateGraph::new();
    graph
        .add_node(EXTRACT, ExtractStage::new(services.extractor))
        .add_node(EMBED, EmbedStage::new(services.embedder))
        .add_node(CLUSTER, ClusterStage::new(services.cluster_params))
        .add_node(CANONICAL, CanonicalStage::new(services.labeler))
        .add_node(AGGREGATE, AggregateStage)
        .add_node(REPORT, ReportStage)
        .set_entry_point(EXTRACT)
        .add_edge(EXTRACT, Some(EMBED))
        .add_edge(EMBED, Some(CLUSTER))
        .add_edge(CLUSTER, Some(CANONICAL))
        .add_edge(CANONICAL, Some(AGGREGATE))
        .add_edge(AGGREGATE, Some(REPORT))
        .add_edge(REPORT, None);

    graph.compile()
}

pub struct ExtractStage {
    extractor: Arc<dyn TopicExtractor>,
}

impl ExtractStage {
    pub fn new(extractor: Arc<dyn TopicExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Stage<PipelineState> for ExtractStage {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        if state.reviews.is_empty() {
            return Err(PipelineError::invalid("review batch is empty"));
        }

        let mut extracted = Vec::with_capacity(state.reviews.len());
        for review in &state.reviews {
            let topics = self
                .extractor
                .extract(&review.text)
                .await
                .map_err(PipelineError::upstream("extraction"))?;
            extracted.push(ExtractedReview::new(review.clone(), topics));
        }

        info!(reviews = extracted.len(), "Extracted topics");
        state.extracted = extracted;
        Ok(state)
    }
}

pub struct EmbedStage {
    embedder: Arc<dyn Embedder>,
}

impl EmbedStage {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl Stage<PipelineState> for EmbedStage {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        // One slot per mention; repeated phrases are not collapsed.
        let phrases: Vec<String> = state
            .extracted
            .iter()
            .flat_map(|item| item.topics.iter().cloned())
            .collect();

        let vectors = self
            .embedder
            .embed(&phrases)
            .await
            .map_err(PipelineError::upstream("embedding"))?;

        if vectors.len() != phrases.len() {
            return Err(PipelineError::upstream("embedding")(anyhow::anyhow!(
                "returned {} vectors for {} phrases",
                vectors.len(),
                phrases.len()
            )));
        }

        info!(phrases = phrases.len(), "Embedded topic phrases");
        state.phrases = phrases;
        state.vectors = vectors;
        Ok(state)
    }
}

pub struct ClusterStage {
    clusterer: AgglomerativeClusterer,
}

impl ClusterStage {
    pub fn new(params: ClusterParams) -> Self {
        Self {
            clusterer: AgglomerativeClusterer::new(params),
        }
    }
}

#[async_trait]
impl Stage<PipelineState> for ClusterStage {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        if state.phrases.len() != state.vectors.len() {
            return Err(PipelineError::invalid(format!(
                "{} phrases but {} vectors",
                state.phrases.len(),
                state.vectors.len()
            )));
        }

        let params = self.clusterer.params();
        let labels = self.clusterer.cluster(&state.vectors)?;
        let clusters = labels.iter().max().map_or(0, |max| max + 1);
        info!(
            phrases = labels.len(),
            clusters,
            threshold = params.distance_threshold,
            linkage = ?params.linkage,
            metric = ?params.metric,
            "Clustered topic phrases"
        );

        state.labels = labels;
        Ok(state)
    }
}

pub struct CanonicalStage {
    canonicalizer: Canonicalizer,
}

impl CanonicalStage {
    pub fn new(labeler: Arc<dyn Labeler>) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(labeler),
        }
    }
}

#[async_trait]
impl Stage<PipelineState> for CanonicalStage {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let groups = group_by_label(&state.phrases, &state.labels)?;

        let mut canonical = Vec::with_capacity(groups.len());
        for (cluster, phrases) in groups {
            let topic = self.canonicalizer.canonicalize(cluster, &phrases).await;
            debug!(cluster, label = %topic.canonical_label, topic_type = %topic.topic_type, members = phrases.len(), "Canonicalized cluster");
            canonical.push(topic);
        }

        info!(clusters = canonical.len(), "Canonicalized clusters");
        state.canonical = canonical;
        Ok(state)
    }
}

pub struct AggregateStage;

#[async_trait]
impl Stage<PipelineState> for AggregateStage {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let observations = map_observations(&state.extracted, &state.canonical);
        let aggregation = TrendAggregator::new(state.start_date, state.end_date).aggregate(&observations);

        state.observations = observations;
        state.table = Some(aggregation.table);
        state.summary = Some(aggregation.summary);
        Ok(state)
    }
}

pub struct ReportStage;

#[async_trait]
impl Stage<PipelineState> for ReportStage {
    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        let table = state
            .table
            .as_ref()
            .ok_or_else(|| PipelineError::invalid("no trend table to report"))?;

        ReportWriter::write_csv(table, &state.output).await?;
        Ok(state)
    }
}

/// One observation per (review, canonical topic) where the review mentions
/// any of the topic's synonyms. Topics sharing a label each credit the review;
/// their counts merge into one row during aggregation.
pub fn map_observations(
    extracted: &[ExtractedReview],
    canonical: &[CanonicalTopic],
) -> Vec<MappedObservation> {
    let mut mapped = Vec::new();

    for item in extracted {
        let date = item.review.date_or_unknown();

        for topic in canonical {
            if topic.synonyms.iter().any(|s| item.mentions(s)) {
                mapped.push(MappedObservation::new(topic.canonical_label.clone(), date));
            }
        }
    }

    mapped
}
