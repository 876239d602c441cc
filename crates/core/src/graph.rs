// Directed, labeled multigraph of tasks and sequences

use crate::error::{ComposeError, Result};
use crate::types::{JoinPolicy, SplitInstance};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Graph produced from a workflow spec; splits are bare split-task names
pub type WorkflowGraph = TaskGraph<String>;

/// Graph handed to the runtime engine; splits carry branch instance ids
pub type ExecutionGraph = TaskGraph<SplitInstance>;

/// Attributes stored on a task node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAttrs<S> {
    /// Base task name (always set in the execution graph)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinPolicy>,
    /// Whether the workflow spec marks this task as a split task
    #[serde(skip_serializing_if = "is_false")]
    pub split: bool,
    /// Open split ancestors on the path that produced this node
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<S>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<S> Default for TaskAttrs<S> {
    fn default() -> Self {
        Self {
            name: None,
            join: None,
            split: false,
            splits: Vec::new(),
        }
    }
}

impl<S> TaskAttrs<S> {
    /// Merge an update into these attributes, last write wins per field
    pub fn merge(&mut self, update: TaskUpdate<S>) {
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(join) = update.join {
            self.join = Some(join);
        }
        if let Some(split) = update.split {
            self.split = split;
        }
        if let Some(splits) = update.splits {
            self.splits = splits;
        }
    }
}

/// Partial attribute update; absent fields leave the node untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate<S> {
    pub name: Option<String>,
    pub join: Option<JoinPolicy>,
    pub split: Option<bool>,
    pub splits: Option<Vec<S>>,
}

impl<S> Default for TaskUpdate<S> {
    fn default() -> Self {
        Self {
            name: None,
            join: None,
            split: None,
            splits: None,
        }
    }
}

impl<S> TaskUpdate<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn join(mut self, join: JoinPolicy) -> Self {
        self.join = Some(join);
        self
    }

    pub fn split(mut self, split: bool) -> Self {
        self.split = Some(split);
        self
    }

    pub fn splits(mut self, splits: Vec<S>) -> Self {
        self.splits = Some(splits);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.join.is_none() && self.split.is_none() && self.splits.is_none()
    }
}

/// Only the attributes actually present on `attrs` end up in the update
impl<S> From<TaskAttrs<S>> for TaskUpdate<S> {
    fn from(attrs: TaskAttrs<S>) -> Self {
        Self {
            name: attrs.name,
            join: attrs.join,
            split: attrs.split.then_some(true),
            splits: (!attrs.splits.is_empty()).then_some(attrs.splits),
        }
    }
}

/// A guarded edge between two tasks
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Sequence {
    pub from: String,
    pub to: String,
    /// Opaque guard expression evaluated by the runtime engine
    pub criteria: String,
}

#[derive(Debug, Clone)]
struct TaskNode<S> {
    id: String,
    attrs: TaskAttrs<S>,
}

/// Directed multigraph of named tasks joined by guarded sequences.
///
/// Tasks are keyed by name. Several sequences may connect the same pair of
/// tasks as long as their criteria differ; callers use [`has_sequence`]
/// before inserting to keep identical triples unique. Sequences are
/// reported in insertion order.
///
/// [`has_sequence`]: TaskGraph::has_sequence
#[derive(Debug, Clone)]
pub struct TaskGraph<S> {
    graph: DiGraph<TaskNode<S>, String>,
    task_indices: HashMap<String, NodeIndex>,
}

impl<S> Default for TaskGraph<S> {
    fn default() -> Self {
        Self {
            graph: DiGraph::new(),
            task_indices: HashMap::new(),
        }
    }
}

impl<S> TaskGraph<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn sequence_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Insert a task; fails if a task with this name already exists
    pub fn add_task(&mut self, name: impl Into<String>, attrs: TaskAttrs<S>) -> Result<()> {
        let name = name.into();
        if self.task_indices.contains_key(&name) {
            return Err(ComposeError::DuplicateTask(name));
        }

        let index = self.graph.add_node(TaskNode {
            id: name.clone(),
            attrs,
        });
        self.task_indices.insert(name, index);

        Ok(())
    }

    /// Merge attributes into an existing task
    pub fn update_task(&mut self, name: &str, update: TaskUpdate<S>) -> Result<()> {
        let index = self.index_of(name)?;
        self.graph[index].attrs.merge(update);
        Ok(())
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.task_indices.contains_key(name)
    }

    /// Get an owned copy of a task's attributes
    pub fn get_task(&self, name: &str) -> Result<TaskAttrs<S>>
    where
        S: Clone,
    {
        let index = self.index_of(name)?;
        Ok(self.graph[index].attrs.clone())
    }

    /// Iterate over tasks in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = (&str, &TaskAttrs<S>)> + '_ {
        self.graph
            .node_weights()
            .map(|node| (node.id.as_str(), &node.attrs))
    }

    /// Add a sequence; both tasks must already exist
    pub fn add_sequence(&mut self, from: &str, to: &str, criteria: impl Into<String>) -> Result<()> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;
        self.graph.add_edge(from_index, to_index, criteria.into());
        Ok(())
    }

    /// Existing sequences from `from` to `to`, optionally with exactly this criteria
    pub fn has_sequence(&self, from: &str, to: &str, criteria: Option<&str>) -> Vec<Sequence> {
        let (Some(&from_index), Some(&to_index)) =
            (self.task_indices.get(from), self.task_indices.get(to))
        else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_connecting(from_index, to_index)
            .filter(|edge| criteria.map_or(true, |c| edge.weight() == c))
            .collect();
        edges.sort_by_key(|edge| edge.id());

        edges
            .into_iter()
            .map(|edge| self.sequence(edge.source(), edge.target(), edge.weight()))
            .collect()
    }

    /// Sequences leaving a task, in insertion order
    pub fn get_next_sequences(&self, task: &str) -> Vec<Sequence> {
        self.directed_sequences(task, Direction::Outgoing)
    }

    /// Sequences entering a task, in insertion order
    pub fn get_prev_sequences(&self, task: &str) -> Vec<Sequence> {
        self.directed_sequences(task, Direction::Incoming)
    }

    /// All sequences in insertion order
    pub fn sequences(&self) -> Vec<Sequence> {
        self.graph
            .edge_references()
            .map(|edge| self.sequence(edge.source(), edge.target(), edge.weight()))
            .collect()
    }

    /// Tasks without any inbound sequence
    pub fn get_start_tasks(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&index| {
                self.graph
                    .neighbors_directed(index, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|index| self.graph[index].id.clone())
            .collect()
    }

    pub fn is_split_task(&self, task: &str) -> bool {
        self.attrs(task).map_or(false, |attrs| attrs.split)
    }

    pub fn is_join_task(&self, task: &str) -> bool {
        self.attrs(task).map_or(false, |attrs| attrs.join.is_some())
    }

    /// Whether a non-empty path of sequences leads from `task` back to itself
    pub fn in_cycle(&self, task: &str) -> bool {
        let Some(&index) = self.task_indices.get(task) else {
            return false;
        };

        self.graph
            .neighbors_directed(index, Direction::Outgoing)
            .any(|next| has_path_connecting(&self.graph, next, index, None))
    }

    fn attrs(&self, task: &str) -> Option<&TaskAttrs<S>> {
        self.task_indices
            .get(task)
            .map(|&index| &self.graph[index].attrs)
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.task_indices
            .get(name)
            .copied()
            .ok_or_else(|| ComposeError::UnknownTask(name.to_string()))
    }

    fn directed_sequences(&self, task: &str, direction: Direction) -> Vec<Sequence> {
        let Some(&index) = self.task_indices.get(task) else {
            return Vec::new();
        };

        // petgraph walks a node's edge list newest first
        let mut edges: Vec<_> = self.graph.edges_directed(index, direction).collect();
        edges.sort_by_key(|edge| edge.id());

        edges
            .into_iter()
            .map(|edge| self.sequence(edge.source(), edge.target(), edge.weight()))
            .collect()
    }

    fn sequence(&self, from: NodeIndex, to: NodeIndex, criteria: &str) -> Sequence {
        Sequence {
            from: self.graph[from].id.clone(),
            to: self.graph[to].id.clone(),
            criteria: criteria.to_string(),
        }
    }
}

#[derive(Serialize)]
struct TaskDocument<'a, S> {
    id: &'a str,
    #[serde(flatten)]
    attrs: &'a TaskAttrs<S>,
}

#[derive(Serialize)]
struct GraphDocument<'a, S> {
    tasks: Vec<TaskDocument<'a, S>>,
    sequences: Vec<Sequence>,
}

/// Serializes as `{ "tasks": [{ "id", ..attrs }], "sequences": [..] }`
impl<S: Serialize> Serialize for TaskGraph<S> {
    fn serialize<Ser>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        GraphDocument {
            tasks: self
                .tasks()
                .map(|(id, attrs)| TaskDocument { id, attrs })
                .collect(),
            sequences: self.sequences(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        graph.add_task("a", TaskAttrs::default()).unwrap();
        graph.add_task("b", TaskAttrs::default()).unwrap();
        graph.add_task("c", TaskAttrs::default()).unwrap();
        graph.add_sequence("a", "b", "a-to-b").unwrap();
        graph.add_sequence("b", "c", "b-to-c").unwrap();
        graph
    }

    #[test]
    fn test_add_duplicate_task_rejected() {
        let mut graph = linear_graph();
        let result = graph.add_task("a", TaskAttrs::default());

        assert!(matches!(result, Err(ComposeError::DuplicateTask(name)) if name == "a"));
        assert_eq!(graph.task_count(), 3);
    }

    #[test]
    fn test_update_unknown_task_rejected() {
        let mut graph = linear_graph();
        let result = graph.update_task("missing", TaskUpdate::new().split(true));

        assert!(matches!(result, Err(ComposeError::UnknownTask(name)) if name == "missing"));
        assert!(graph.get_task("missing").is_err());
    }

    #[test]
    fn test_update_task_merges_attributes() {
        let mut graph = linear_graph();
        graph
            .update_task("b", TaskUpdate::new().join(JoinPolicy::All))
            .unwrap();
        graph
            .update_task("b", TaskUpdate::new().splits(vec!["a".to_string()]))
            .unwrap();

        let attrs = graph.get_task("b").unwrap();
        assert_eq!(attrs.join, Some(JoinPolicy::All));
        assert_eq!(attrs.splits, vec!["a".to_string()]);

        // Later writes replace earlier values for the same attribute
        graph
            .update_task("b", TaskUpdate::new().splits(vec!["c".to_string()]))
            .unwrap();
        assert_eq!(graph.get_task("b").unwrap().splits, vec!["c".to_string()]);
        assert!(graph.is_join_task("b"));
    }

    #[test]
    fn test_get_task_returns_copy() {
        let graph = linear_graph();
        let mut attrs = graph.get_task("a").unwrap();
        attrs.splits.push("a".to_string());
        attrs.split = true;

        assert!(graph.get_task("a").unwrap().splits.is_empty());
        assert!(!graph.is_split_task("a"));
    }

    #[test]
    fn test_add_sequence_requires_endpoints() {
        let mut graph = linear_graph();

        assert!(graph.add_sequence("a", "missing", "x").is_err());
        assert!(graph.add_sequence("missing", "a", "x").is_err());
        assert_eq!(graph.sequence_count(), 2);
    }

    #[test]
    fn test_has_sequence_dedup() {
        let mut graph = linear_graph();

        for criteria in ["same", "same"] {
            if graph.has_sequence("a", "c", Some(criteria)).is_empty() {
                graph.add_sequence("a", "c", criteria).unwrap();
            }
        }
        assert_eq!(graph.has_sequence("a", "c", None).len(), 1);

        if graph.has_sequence("a", "c", Some("other")).is_empty() {
            graph.add_sequence("a", "c", "other").unwrap();
        }
        let seqs = graph.has_sequence("a", "c", None);
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].criteria, "same");
        assert_eq!(seqs[1].criteria, "other");
        assert_eq!(graph.has_sequence("a", "c", Some("other")).len(), 1);
    }

    #[test]
    fn test_sequences_in_insertion_order() {
        let mut graph = linear_graph();
        graph.add_task("d", TaskAttrs::default()).unwrap();
        graph.add_sequence("a", "d", "a-to-d").unwrap();
        graph.add_sequence("a", "c", "a-to-c").unwrap();

        let next: Vec<_> = graph
            .get_next_sequences("a")
            .into_iter()
            .map(|s| s.to)
            .collect();
        assert_eq!(next, vec!["b", "d", "c"]);

        let prev: Vec<_> = graph
            .get_prev_sequences("c")
            .into_iter()
            .map(|s| s.from)
            .collect();
        assert_eq!(prev, vec!["b", "a"]);
        assert!(graph.get_next_sequences("missing").is_empty());
    }

    #[test]
    fn test_start_tasks() {
        let mut graph = linear_graph();
        graph.add_task("z", TaskAttrs::default()).unwrap();
        graph.add_sequence("z", "c", "z-to-c").unwrap();

        assert_eq!(graph.get_start_tasks(), vec!["a", "z"]);
    }

    #[test]
    fn test_in_cycle() {
        let mut graph = linear_graph();
        assert!(!graph.in_cycle("a"));
        assert!(!graph.in_cycle("b"));

        graph.add_sequence("c", "b", "c-to-b").unwrap();
        assert!(!graph.in_cycle("a"));
        assert!(graph.in_cycle("b"));
        assert!(graph.in_cycle("c"));

        graph.add_sequence("a", "a", "retry").unwrap();
        assert!(graph.in_cycle("a"));
        assert!(!graph.in_cycle("missing"));
    }

    #[test]
    fn test_serialize_graph() {
        let mut graph = ExecutionGraph::new();
        graph
            .add_task(
                "b__1",
                TaskAttrs {
                    name: Some("b".to_string()),
                    join: None,
                    split: true,
                    splits: vec![SplitInstance::new("b", 1)],
                },
            )
            .unwrap();
        graph
            .add_task(
                "c",
                TaskAttrs {
                    name: Some("c".to_string()),
                    join: Some(JoinPolicy::All),
                    ..Default::default()
                },
            )
            .unwrap();
        graph.add_sequence("b__1", "c", "b-to-c").unwrap();

        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "tasks": [
                    {
                        "id": "b__1",
                        "name": "b",
                        "split": true,
                        "splits": [{"task": "b", "id": 1}]
                    },
                    {"id": "c", "name": "c", "join": "all"}
                ],
                "sequences": [
                    {"from": "b__1", "to": "c", "criteria": "b-to-c"}
                ]
            })
        );
    }
}
