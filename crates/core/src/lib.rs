// Workflow composition: compiles workflow definitions into execution graphs

pub mod composer;
pub mod criteria;
pub mod error;
pub mod graph;
pub mod spec;
pub mod types;

pub use composer::{compose, get_composer, WorkflowComposer};
pub use error::{ComposeError, Result};
pub use graph::{ExecutionGraph, Sequence, TaskAttrs, TaskGraph, TaskUpdate, WorkflowGraph};
pub use types::*;
