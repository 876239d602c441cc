//! Error types for workflow composition.

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors that can occur while composing a workflow.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A task was inserted into a graph that already holds it.
    #[error("Task already exists: {0}")]
    DuplicateTask(String),

    /// A task was looked up or updated but is not in the graph.
    #[error("Task not found: {0}")]
    UnknownTask(String),

    /// The workflow definition could not be parsed.
    #[error("Malformed workflow definition: {0}")]
    MalformedSpec(String),

    /// No composer is registered under the requested name.
    #[error("Unknown composer: {0}")]
    UnknownComposer(String),
}

impl ComposeError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSpec(message.into())
    }
}

impl From<serde_yaml_ng::Error> for ComposeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::MalformedSpec(err.to_string())
    }
}
