use super::execution_graph::compose_execution_graph;
use super::workflow_graph::compose_workflow_graph;
use super::WorkflowComposer;
use crate::criteria::{CriteriaBuilder, YaqlCriteria};
use crate::error::Result;
use crate::graph::{ExecutionGraph, WorkflowGraph};
use crate::spec::MistralSpec;

/// Composer for Mistral v2 workflow definitions
pub struct MistralComposer {
    criteria: Box<dyn CriteriaBuilder>,
}

impl MistralComposer {
    pub const NAME: &'static str = "mistral";

    pub fn new() -> Self {
        Self::with_criteria(YaqlCriteria)
    }

    /// Use a different guard expression builder for sequence criteria
    pub fn with_criteria(criteria: impl CriteriaBuilder + 'static) -> Self {
        Self {
            criteria: Box::new(criteria),
        }
    }

    /// Build the workflow graph of an already parsed spec
    pub fn workflow_graph(&self, spec: &MistralSpec) -> Result<WorkflowGraph> {
        compose_workflow_graph(spec, self.criteria.as_ref())
    }

    /// Compose an already parsed spec into an execution graph
    pub fn compose_spec(&self, spec: &MistralSpec) -> Result<ExecutionGraph> {
        let wf_graph = self.workflow_graph(spec)?;
        let wf_ex_graph = compose_execution_graph(&wf_graph)?;

        tracing::info!(
            "Composed workflow {}: {} tasks, {} task instances, {} sequences",
            spec.name(),
            wf_graph.task_count(),
            wf_ex_graph.task_count(),
            wf_ex_graph.sequence_count()
        );

        Ok(wf_ex_graph)
    }
}

impl Default for MistralComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowComposer for MistralComposer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compose_workflow_graph(&self, definition: &str) -> Result<WorkflowGraph> {
        let spec = MistralSpec::parse(definition)?;
        self.workflow_graph(&spec)
    }

    fn compose(&self, definition: &str) -> Result<ExecutionGraph> {
        let spec = MistralSpec::parse(definition)?;
        self.compose_spec(&spec)
    }
}
