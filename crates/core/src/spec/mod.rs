// Workflow spec interface consumed by the composer

pub mod mistral;

pub use mistral::{MistralSpec, TaskSpec, Transition};

use crate::types::{Condition, JoinPolicy};
use std::collections::BTreeSet;

/// A transition reported by a spec for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextTask {
    pub name: String,
    /// User condition, still in its original delimited form
    pub expr: Option<String>,
    pub condition: Condition,
}

impl NextTask {
    pub fn new(name: impl Into<String>, expr: Option<String>, condition: Condition) -> Self {
        Self {
            name: name.into(),
            expr,
            condition,
        }
    }
}

/// Parsed workflow definition, as seen by the graph builder
pub trait WorkflowSpec {
    /// Per-task spec type
    type Task;

    /// Tasks no transition leads to
    fn get_start_tasks(&self) -> BTreeSet<String>;

    /// Outgoing transitions of a task. The order is kept as edge insertion order.
    fn get_next_tasks(&self, task_name: &str) -> Vec<NextTask>;

    fn get_task(&self, task_name: &str) -> Option<&Self::Task>;

    fn is_split_task(&self, task_name: &str) -> bool;

    fn join_policy(&self, task_name: &str) -> Option<JoinPolicy>;

    fn is_join_task(&self, task_name: &str) -> bool {
        self.join_policy(task_name).is_some()
    }

    /// Whether the task can transition back to itself
    fn in_cycle(&self, task_name: &str) -> bool;
}
