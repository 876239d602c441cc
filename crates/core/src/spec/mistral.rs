//! Mistral v2 workflow definitions.
//!
//! A definition is a YAML document holding a `version` key and exactly one
//! workflow keyed by its name:
//!
//! ```yaml
//! version: '2.0'
//! deploy:
//!   tasks:
//!     build:
//!       action: std.noop
//!       on-success:
//!         - test
//!         - notify: <% $.notify %>
//!     test:
//!       on-error: build
//!     notify:
//!       join: all
//! ```
//!
//! Transitions are listed under `on-success`, `on-error` and `on-complete`.
//! Each entry is either a task name or a single-entry map from task name to
//! a guard expression.

use super::{NextTask, WorkflowSpec};
use crate::error::{ComposeError, Result};
use crate::types::{Condition, JoinPolicy};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Deserialize;
use serde_yaml_ng::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The only definition version understood by this parser
pub const SUPPORTED_VERSION: &str = "2.0";

/// One transition entry of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub task: String,
    pub expr: Option<String>,
}

/// Transitions listed under one condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTransitions")]
pub struct Transitions(Vec<Transition>);

impl Transitions {
    pub fn as_slice(&self) -> &[Transition] {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTransitions {
    One(RawTransition),
    Many(Vec<RawTransition>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTransition {
    Task(String),
    Guarded(BTreeMap<String, String>),
}

impl TryFrom<RawTransitions> for Transitions {
    type Error = String;

    fn try_from(raw: RawTransitions) -> std::result::Result<Self, Self::Error> {
        let entries = match raw {
            RawTransitions::One(entry) => vec![entry],
            RawTransitions::Many(entries) => entries,
        };

        let transitions = entries
            .into_iter()
            .map(|entry| match entry {
                RawTransition::Task(task) => Ok(Transition { task, expr: None }),
                RawTransition::Guarded(guarded) => {
                    let mut guarded = guarded.into_iter();
                    match (guarded.next(), guarded.next()) {
                        (Some((task, expr)), None) => Ok(Transition {
                            task,
                            expr: Some(expr),
                        }),
                        _ => Err("guarded transition must name exactly one task".to_string()),
                    }
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self(transitions))
    }
}

/// Specification of a single task
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskSpec {
    pub action: Option<String>,
    pub workflow: Option<String>,
    pub description: Option<String>,
    pub join: Option<JoinPolicy>,
    #[serde(default)]
    pub on_success: Transitions,
    #[serde(default)]
    pub on_error: Transitions,
    #[serde(default)]
    pub on_complete: Transitions,
}

impl TaskSpec {
    pub fn transitions(&self, condition: Condition) -> &[Transition] {
        match condition {
            Condition::OnSuccess => self.on_success.as_slice(),
            Condition::OnError => self.on_error.as_slice(),
            Condition::OnComplete => self.on_complete.as_slice(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowDefinition {
    description: Option<String>,
    #[serde(default)]
    tasks: BTreeMap<String, TaskSpec>,
}

/// Parsed Mistral workflow with its transition topology
#[derive(Debug, Clone)]
pub struct MistralSpec {
    name: String,
    description: Option<String>,
    tasks: BTreeMap<String, TaskSpec>,
    transitions: DiGraph<String, Condition>,
    task_indices: HashMap<String, NodeIndex>,
}

impl MistralSpec {
    /// Parse a YAML definition
    pub fn parse(definition: &str) -> Result<Self> {
        let mut document: BTreeMap<String, Value> = serde_yaml_ng::from_str(definition)?;

        let version = document
            .remove("version")
            .ok_or_else(|| ComposeError::malformed("missing 'version' key"))?;
        check_version(&version)?;

        let mut workflows = document.into_iter();
        let (name, body) = match (workflows.next(), workflows.next()) {
            (Some(workflow), None) => workflow,
            (None, _) => return Err(ComposeError::malformed("definition contains no workflow")),
            (Some(_), Some(_)) => {
                return Err(ComposeError::malformed(
                    "definition must contain exactly one workflow",
                ))
            }
        };

        let workflow: WorkflowDefinition = serde_yaml_ng::from_value(body)?;

        Self::from_tasks(name, workflow.description, workflow.tasks)
    }

    /// Build a spec from already parsed tasks
    pub fn from_tasks(
        name: impl Into<String>,
        description: Option<String>,
        tasks: BTreeMap<String, TaskSpec>,
    ) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            return Err(ComposeError::malformed(format!(
                "workflow '{}' has no tasks",
                name
            )));
        }

        let mut transitions = DiGraph::new();
        let mut task_indices = HashMap::new();

        for task_name in tasks.keys() {
            let index = transitions.add_node(task_name.clone());
            task_indices.insert(task_name.clone(), index);
        }

        for (task_name, task) in &tasks {
            let from = task_indices[task_name];

            for condition in Condition::ALL {
                for transition in task.transitions(condition) {
                    let to = task_indices.get(&transition.task).ok_or_else(|| {
                        ComposeError::malformed(format!(
                            "task '{}' transitions to undeclared task '{}'",
                            task_name, transition.task
                        ))
                    })?;

                    transitions.add_edge(from, *to, condition);
                }
            }
        }

        Ok(Self {
            name,
            description,
            tasks,
            transitions,
            task_indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&str, &TaskSpec)> + '_ {
        self.tasks.iter().map(|(name, task)| (name.as_str(), task))
    }

    /// Distinct tasks with a transition to `task_name`
    pub fn get_prev_tasks(&self, task_name: &str) -> BTreeSet<String> {
        let Some(&index) = self.task_indices.get(task_name) else {
            return BTreeSet::new();
        };

        self.transitions
            .neighbors_directed(index, Direction::Incoming)
            .map(|prev| self.transitions[prev].clone())
            .collect()
    }
}

fn check_version(version: &Value) -> Result<()> {
    let supported = match version {
        Value::String(version) => version == SUPPORTED_VERSION,
        Value::Number(version) => version.as_f64() == Some(2.0),
        _ => false,
    };

    if supported {
        Ok(())
    } else {
        Err(ComposeError::malformed(format!(
            "unsupported version {:?}, expected '{}'",
            version, SUPPORTED_VERSION
        )))
    }
}

impl WorkflowSpec for MistralSpec {
    type Task = TaskSpec;

    fn get_start_tasks(&self) -> BTreeSet<String> {
        self.transitions
            .node_indices()
            .filter(|&index| {
                self.transitions
                    .neighbors_directed(index, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|index| self.transitions[index].clone())
            .collect()
    }

    fn get_next_tasks(&self, task_name: &str) -> Vec<NextTask> {
        let Some(task) = self.tasks.get(task_name) else {
            return Vec::new();
        };

        Condition::ALL
            .iter()
            .flat_map(|&condition| {
                task.transitions(condition).iter().map(move |transition| {
                    NextTask::new(transition.task.clone(), transition.expr.clone(), condition)
                })
            })
            .collect()
    }

    fn get_task(&self, task_name: &str) -> Option<&TaskSpec> {
        self.tasks.get(task_name)
    }

    /// A task entered from more than one task without a join barrier
    fn is_split_task(&self, task_name: &str) -> bool {
        !self.is_join_task(task_name) && self.get_prev_tasks(task_name).len() > 1
    }

    fn join_policy(&self, task_name: &str) -> Option<JoinPolicy> {
        self.tasks.get(task_name).and_then(|task| task.join)
    }

    fn in_cycle(&self, task_name: &str) -> bool {
        let Some(&index) = self.task_indices.get(task_name) else {
            return false;
        };

        self.transitions
            .neighbors_directed(index, Direction::Outgoing)
            .any(|next| has_path_connecting(&self.transitions, next, index, None))
    }
}
