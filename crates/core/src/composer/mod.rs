// Two-phase composition: workflow spec -> workflow graph -> execution graph

pub mod execution_graph;
pub mod mistral;
pub mod workflow_graph;

pub use execution_graph::{compose_execution_graph, task_instance_name, SplitCounter};
pub use mistral::MistralComposer;
pub use workflow_graph::compose_workflow_graph;

use crate::error::{ComposeError, Result};
use crate::graph::{ExecutionGraph, WorkflowGraph};

/// Composer used when none is named
pub const DEFAULT_COMPOSER: &str = MistralComposer::NAME;

/// Turns a raw workflow definition into graphs
pub trait WorkflowComposer: Send + Sync {
    /// Name the composer is registered under
    fn name(&self) -> &str;

    /// Parse the definition and build its logical workflow graph
    fn compose_workflow_graph(&self, definition: &str) -> Result<WorkflowGraph>;

    /// Parse the definition and expand it into an execution graph
    fn compose(&self, definition: &str) -> Result<ExecutionGraph>;
}

/// Names of all registered composers
pub fn available_composers() -> &'static [&'static str] {
    &[MistralComposer::NAME]
}

/// Look up a composer by name
pub fn get_composer(name: &str) -> Result<Box<dyn WorkflowComposer>> {
    match name {
        MistralComposer::NAME => Ok(Box::new(MistralComposer::new())),
        other => Err(ComposeError::UnknownComposer(other.to_string())),
    }
}

/// Compose a definition with the default composer
pub fn compose(definition: &str) -> Result<ExecutionGraph> {
    MistralComposer::new().compose(definition)
}
