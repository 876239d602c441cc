use crate::error::Result;
use crate::graph::{ExecutionGraph, TaskAttrs, TaskUpdate, WorkflowGraph};
use crate::types::SplitInstance;
use std::collections::{HashMap, VecDeque};

/// Counts branch instances created per split task during one expansion
#[derive(Debug, Clone, Default)]
pub struct SplitCounter {
    counts: HashMap<String, u32>,
}

impl SplitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next instance id for a split task, starting at 1
    pub fn next(&mut self, task_name: &str) -> u32 {
        let count = self.counts.entry(task_name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Instances created so far for a split task
    pub fn get(&self, task_name: &str) -> u32 {
        self.counts.get(task_name).copied().unwrap_or(0)
    }
}

/// Name of a task instance in the execution graph: `task` or `task__<id>`
pub fn task_instance_name(task_name: &str, split_id: u32) -> String {
    if split_id > 0 {
        format!("{}__{}", task_name, split_id)
    } else {
        task_name.to_string()
    }
}

#[derive(Debug)]
struct QueueItem {
    task_name: String,
    prev_instance: Option<String>,
    criteria: Option<String>,
    splits: Vec<SplitInstance>,
}

/// Expand a workflow graph into an execution graph.
///
/// Every time a split task is reached from a new inbound sequence it gets a
/// fresh instance, and the tasks downstream of it are suffixed with the id
/// of the innermost open split. Join fan-in is rebuilt on each arrival from
/// all inbound sequences of the task, resolving each source to the branch
/// instance that matches the arrival's split context.
pub fn compose_execution_graph(wf_graph: &WorkflowGraph) -> Result<ExecutionGraph> {
    let mut split_counter = SplitCounter::new();
    let mut wf_ex_graph = ExecutionGraph::new();
    // Inbound edges waiting on their source instance, keyed by source
    let mut pending: HashMap<String, Vec<(String, String)>> = HashMap::new();
    let mut queue: VecDeque<QueueItem> = wf_graph
        .get_start_tasks()
        .into_iter()
        .map(|task_name| QueueItem {
            task_name,
            prev_instance: None,
            criteria: None,
            splits: Vec::new(),
        })
        .collect();

    while let Some(item) = queue.pop_front() {
        let QueueItem {
            task_name,
            prev_instance,
            criteria,
            mut splits,
        } = item;

        let task_attrs = wf_graph.get_task(&task_name)?;
        let expected_splits = task_attrs.splits;

        // A task that belongs to a split branch but arrives from outside any
        // branch is reached too early in a multi-level split and join. It is
        // processed again when it arrives from within the branch.
        let prev_has_splits = match &prev_instance {
            Some(prev) => !wf_ex_graph.get_task(prev)?.splits.is_empty(),
            None => false,
        };

        if !expected_splits.is_empty() && !expected_splits.contains(&task_name) && !prev_has_splits
        {
            tracing::debug!(
                "Deferring task {} reached from {:?} outside of splits {:?}",
                task_name,
                prev_instance,
                expected_splits
            );
            continue;
        }

        let is_split_task = wf_graph.is_split_task(&task_name);

        if is_split_task && !wf_graph.in_cycle(&task_name) {
            let split_id = split_counter.next(&task_name);
            splits.push(SplitInstance::new(task_name.as_str(), split_id));
        }

        let instance_name =
            task_instance_name(&task_name, splits.last().map_or(0, |split| split.id));

        let instance_attrs = TaskAttrs {
            name: Some(task_name.clone()),
            join: task_attrs.join,
            split: task_attrs.split,
            splits: splits.clone(),
        };

        // An existing instance means the walk came around a cycle
        if wf_ex_graph.has_task(&instance_name) {
            wf_ex_graph.update_task(&instance_name, TaskUpdate::from(instance_attrs))?;
        } else {
            tracing::debug!("Adding task instance {}", instance_name);
            wf_ex_graph.add_task(instance_name.as_str(), instance_attrs)?;

            for (to, criteria) in pending.remove(&instance_name).unwrap_or_default() {
                add_unique_sequence(&mut wf_ex_graph, &instance_name, &to, &criteria)?;
            }

            for next_seq in wf_graph.get_next_sequences(&task_name) {
                queue.push_back(QueueItem {
                    task_name: next_seq.to,
                    prev_instance: Some(instance_name.clone()),
                    criteria: Some(next_seq.criteria),
                    splits: splits.clone(),
                });
            }
        }

        // Each inbound transition of a split task spawns its own instance,
        // so only the triggering sequence is connected
        if is_split_task {
            if let (Some(prev), Some(criteria)) = (&prev_instance, &criteria) {
                add_unique_sequence(&mut wf_ex_graph, prev, &instance_name, criteria)?;
                continue;
            }
        }

        for prev_seq in wf_graph.get_prev_sequences(&task_name) {
            let prev_task = wf_graph.get_task(&prev_seq.from)?;

            let mut split_id = 0;
            for prev_task_split in &prev_task.splits {
                if let Some(split) = splits.iter().find(|s| &s.task == prev_task_split) {
                    split_id = split.id;
                }
            }

            let prev_instance_name = task_instance_name(&prev_seq.from, split_id);

            // Connected once the source instance is materialized
            if !wf_ex_graph.has_task(&prev_instance_name) {
                pending
                    .entry(prev_instance_name)
                    .or_default()
                    .push((instance_name.clone(), prev_seq.criteria));
                continue;
            }

            add_unique_sequence(
                &mut wf_ex_graph,
                &prev_instance_name,
                &instance_name,
                &prev_seq.criteria,
            )?;
        }
    }

    tracing::debug!(
        "Expanded execution graph: {} tasks, {} sequences, {} split instances",
        wf_ex_graph.task_count(),
        wf_ex_graph.sequence_count(),
        split_counter.counts.values().sum::<u32>()
    );

    Ok(wf_ex_graph)
}

fn add_unique_sequence(
    graph: &mut ExecutionGraph,
    from: &str,
    to: &str,
    criteria: &str,
) -> Result<()> {
    if graph.has_sequence(from, to, Some(criteria)).is_empty() {
        graph.add_sequence(from, to, criteria)?;
    }
    Ok(())
}
