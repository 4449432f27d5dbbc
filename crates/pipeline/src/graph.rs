use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::PipelineError;

/// One step of a pipeline: reads what it needs from the state, writes its
/// outputs back, and returns the state.
///
/// Stages must overwrite their outputs rather than append to them, so that
/// running a stage twice on the same input gives the same result.
#[async_trait]
pub trait Stage<S>: Send + Sync
where
    S: Send + 'static,
{
    async fn run(&self, state: S) -> Result<S, PipelineError>;
}

/// Named stages, a successor edge per stage and one entry stage. Compiling
/// checks the wiring; the compiled graph threads a single state value through
/// the chain until a stage with no successor has run.
pub struct StateGraph<S: Send + 'static> {
    nodes: HashMap<String, Arc<dyn Stage<S>>>,
    edges: HashMap<String, Option<String>>,
    entry_point: Option<String>,
    duplicates: Vec<String>,
}

impl<S: Send + 'static> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry_point: None,
            duplicates: Vec::new(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, stage: impl Stage<S> + 'static) -> &mut Self {
        let name = name.into();
        if self.nodes.insert(name.clone(), Arc::new(stage)).is_some() {
            self.duplicates.push(name);
        }
        self
    }

    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry_point = Some(name.into());
        self
    }

    /// Set the successor of `from`; `None` marks `from` as terminal.
    pub fn add_edge(&mut self, from: impl Into<String>, to: Option<&str>) -> &mut Self {
        self.edges.insert(from.into(), to.map(str::to_string));
        self
    }

    /// Check the graph and fix its stage order.
    pub fn compile(self) -> Result<CompiledGraph<S>, PipelineError> {
        if let Some(name) = self.duplicates.first() {
            return Err(graph_error(format!("stage '{}' was added more than once", name)));
        }

        let entry = self
            .entry_point
            .clone()
            .ok_or_else(|| graph_error("no entry point set"))?;
        if !self.nodes.contains_key(&entry) {
            return Err(graph_error(format!("entry point '{}' is not a stage", entry)));
        }

        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(graph_error(format!("edge from unknown stage '{}'", from)));
            }
            if let Some(to) = to {
                if !self.nodes.contains_key(to) {
                    return Err(graph_error(format!("edge from '{}' to unknown stage '{}'", from, to)));
                }
            }
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(entry);
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                return Err(graph_error(format!("stage '{}' is reached twice; the chain has a cycle", name)));
            }
            current = self.edges.get(&name).cloned().flatten();
            order.push(name);
        }

        for name in self.nodes.keys().filter(|name| !seen.contains(*name)) {
            warn!(stage = %name, "Stage is not reachable from the entry point and will never run");
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            order,
        })
    }
}

impl<S: Send + 'static> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn graph_error(reason: impl Into<String>) -> PipelineError {
    PipelineError::Graph {
        reason: reason.into(),
    }
}

pub struct CompiledGraph<S: Send + 'static> {
    nodes: HashMap<String, Arc<dyn Stage<S>>>,
    edges: HashMap<String, Option<String>>,
    order: Vec<String>,
}

impl<S: Send + 'static> CompiledGraph<S> {
    /// Stage names in execution order.
    pub fn stage_order(&self) -> &[String] {
        &self.order
    }

    /// Run every stage once, in order. The first failing stage aborts the run
    /// and its partial state is dropped.
    pub async fn invoke(&self, state: S) -> Result<S, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        self.walk(state).instrument(span).await
    }

    async fn walk(&self, mut state: S) -> Result<S, PipelineError> {
        let run_start = Instant::now();
        let mut current = self.order.first().cloned();

        while let Some(name) = current {
            let stage = self
                .nodes
                .get(&name)
                .ok_or_else(|| graph_error(format!("stage '{}' disappeared", name)))?;

            info!(stage = %name, "Stage started");
            let started = Instant::now();

            state = match stage.run(state).await {
                Ok(next) => next,
                Err(e) => {
                    error!(stage = %name, error = %e, "Stage failed, aborting run");
                    return Err(PipelineError::AbortedRun {
                        stage: name,
                        source: Box::new(e),
                    });
                }
            };

            info!(stage = %name, elapsed_ms = started.elapsed().as_millis() as u64, "Stage finished");
            current = self.edges.get(&name).cloned().flatten();
        }

        info!(elapsed_ms = run_start.elapsed().as_millis() as u64, "Run complete");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Record {
        name: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl Stage<Vec<&'static str>> for Record {
        async fn run(&self, mut state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            self.trace.lock().unwrap().push(self.name.to_string());
            state.push(self.name);
            Ok(state)
        }
    }

    struct Fail;

    #[async_trait]
    impl Stage<Vec<&'static str>> for Fail {
        async fn run(&self, _state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            Err(PipelineError::invalid("nothing to do"))
        }
    }

    fn record(name: &'static str, trace: &Trace) -> Record {
        Record {
            name,
            trace: trace.clone(),
        }
    }

    fn abc(trace: &Trace) -> StateGraph<Vec<&'static str>> {
        let mut graph = StateGraph::new();
        graph
            .add_node("A", record("A", trace))
            .add_node("B", record("B", trace))
            .add_node("C", record("C", trace))
            .set_entry_point("A")
            .add_edge("A", Some("B"))
            .add_edge("B", Some("C"))
            .add_edge("C", None);
        graph
    }

    #[tokio::test]
    async fn test_runs_each_stage_once_in_order() {
        let trace = Trace::default();
        let graph = abc(&trace).compile().unwrap();

        assert_eq!(graph.stage_order(), ["A", "B", "C"]);

        let state = graph.invoke(Vec::new()).await.unwrap();
        assert_eq!(state, vec!["A", "B", "C"]);
        assert_eq!(*trace.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_missing_edge_is_terminal() {
        let trace = Trace::default();
        let mut graph = StateGraph::new();
        graph
            .add_node("A", record("A", &trace))
            .add_node("B", record("B", &trace))
            .set_entry_point("A")
            .add_edge("A", Some("B"));

        let state = graph.compile().unwrap().invoke(Vec::new()).await.unwrap();
        assert_eq!(state, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_stages() {
        let trace = Trace::default();
        let mut graph = StateGraph::new();
        graph
            .add_node("A", record("A", &trace))
            .add_node("B", Fail)
            .add_node("C", record("C", &trace))
            .set_entry_point("A")
            .add_edge("A", Some("B"))
            .add_edge("B", Some("C"));

        let err = graph.compile().unwrap().invoke(Vec::new()).await.unwrap_err();

        match &err {
            PipelineError::AbortedRun { stage, .. } => assert_eq!(stage, "B"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root(), PipelineError::InvalidInput { .. }));
        assert_eq!(*trace.lock().unwrap(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_compiled_graph_is_reusable_with_fresh_state() {
        let trace = Trace::default();
        let graph = abc(&trace).compile().unwrap();

        let first = graph.invoke(Vec::new()).await.unwrap();
        let second = graph.invoke(Vec::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(trace.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_compile_rejects_cycles() {
        let trace = Trace::default();
        let mut graph = abc(&trace);
        graph.add_edge("C", Some("A"));

        assert!(matches!(graph.compile(), Err(PipelineError::Graph { .. })));
    }

    #[test]
    fn test_compile_rejects_unknown_stages() {
        let trace = Trace::default();

        let mut graph = abc(&trace);
        graph.add_edge("C", Some("D"));
        assert!(graph.compile().is_err());

        let mut graph = abc(&trace);
        graph.set_entry_point("Z");
        assert!(graph.compile().is_err());

        let graph: StateGraph<Vec<&'static str>> = StateGraph::new();
        assert!(graph.compile().is_err());
    }

    #[test]
    fn test_compile_rejects_duplicate_stage_names() {
        let trace = Trace::default();
        let mut graph = abc(&trace);
        graph.add_node("B", record("B2", &trace));

        assert!(graph.compile().is_err());
    }
}
