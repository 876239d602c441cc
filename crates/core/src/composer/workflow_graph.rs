use crate::criteria::CriteriaBuilder;
use crate::error::Result;
use crate::graph::{TaskAttrs, TaskUpdate, WorkflowGraph};
use crate::spec::WorkflowSpec;
use std::collections::VecDeque;

/// Build the logical workflow graph from a spec.
///
/// Walks the workflow spec breadth first from its start tasks. Every queue item
/// carries its own copy of the split tasks opened along its path, so a task
/// reached through several paths is revisited and its `splits` reflect the
/// last path processed. Tasks in a cycle are only queued the first time
/// they are seen, which bounds the walk.
pub fn compose_workflow_graph<W>(spec: &W, criteria: &dyn CriteriaBuilder) -> Result<WorkflowGraph>
where
    W: WorkflowSpec + ?Sized,
{
    let mut graph = WorkflowGraph::new();
    let mut queue: VecDeque<(String, Vec<String>)> = spec
        .get_start_tasks()
        .into_iter()
        .map(|task_name| (task_name, Vec::new()))
        .collect();

    while let Some((task_name, mut splits)) = queue.pop_front() {
        if !graph.has_task(&task_name) {
            graph.add_task(task_name.as_str(), TaskAttrs::default())?;
        }

        let mut update = TaskUpdate::new();

        if spec.is_join_task(&task_name) {
            if let Some(join) = spec.join_policy(&task_name) {
                update = update.join(join);
            }
        }

        // Only splits outside of a cycle open a new branch context
        if spec.is_split_task(&task_name) {
            update = update.split(true);

            if !spec.in_cycle(&task_name) {
                splits.push(task_name.clone());
            }
        }

        if !splits.is_empty() {
            update = update.splits(splits.clone());
        }

        if !update.is_empty() {
            graph.update_task(&task_name, update)?;
        }

        tracing::debug!("Composed workflow task {} (splits: {:?})", task_name, splits);

        for next in spec.get_next_tasks(&task_name) {
            if !graph.has_task(&next.name) {
                graph.add_task(next.name.as_str(), TaskAttrs::default())?;
                queue.push_back((next.name.clone(), splits.clone()));
            } else if !spec.in_cycle(&next.name) {
                queue.push_back((next.name.clone(), splits.clone()));
            }

            let sequence_criteria =
                criteria.compose(&task_name, next.condition, next.expr.as_deref());

            if graph
                .has_sequence(&task_name, &next.name, Some(&sequence_criteria))
                .is_empty()
            {
                graph.add_sequence(&task_name, &next.name, sequence_criteria)?;
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::YaqlCriteria;
    use crate::spec::MistralSpec;
    use crate::types::JoinPolicy;

    fn build(definition: &str) -> WorkflowGraph {
        let spec = MistralSpec::parse(definition).unwrap();
        compose_workflow_graph(&spec, &YaqlCriteria).unwrap()
    }

    #[test]
    fn test_sequential_graph() {
        let graph = build(
            r#"
version: '2.0'
sequential:
  tasks:
    task1:
      on-success: [task2]
    task2:
      on-success: [task3]
    task3: {}
"#,
        );

        assert_eq!(graph.task_count(), 3);
        assert_eq!(graph.get_start_tasks(), vec!["task1"]);

        let seqs = graph.get_next_sequences("task1");
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].to, "task2");
        assert_eq!(
            seqs[0].criteria,
            r#"task(task1).get(state, "UNKNOWN") in ["SUCCESS"]"#
        );
        assert!(graph
            .tasks()
            .all(|(_, attrs)| attrs.splits.is_empty() && !attrs.split));
    }

    #[test]
    fn test_split_tracked_downstream() {
        let graph = build(
            r#"
version: '2.0'
split:
  tasks:
    a:
      on-success: [s]
    b:
      on-success: [s]
    s:
      on-success: [t]
    t: {}
"#,
        );

        let s = graph.get_task("s").unwrap();
        assert!(s.split);
        assert_eq!(s.splits, vec!["s"]);
        assert_eq!(graph.get_task("t").unwrap().splits, vec!["s"]);
        assert!(graph.get_task("a").unwrap().splits.is_empty());
        // reached twice, but one edge per distinct criteria
        assert_eq!(graph.has_sequence("s", "t", None).len(), 1);
    }

    #[test]
    fn test_join_policy_recorded() {
        let graph = build(
            r#"
version: '2.0'
join:
  tasks:
    a:
      on-success: [b, c]
    b:
      on-success: [d]
    c:
      on-success: [d]
    d:
      join: 2
"#,
        );

        assert_eq!(graph.get_task("d").unwrap().join, Some(JoinPolicy::Count(2)));
        assert!(graph.is_join_task("d"));
        assert!(!graph.is_split_task("d"));
        assert_eq!(graph.get_prev_sequences("d").len(), 2);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = build(
            r#"
version: '2.0'
cycle:
  tasks:
    init:
      on-success: [check]
    check:
      on-success: [work]
    work:
      on-success: [check]
      on-error: [fail]
    fail: {}
"#,
        );

        assert_eq!(graph.task_count(), 4);
        assert_eq!(graph.sequence_count(), 4);
        assert!(graph.in_cycle("check"));
        assert!(graph.in_cycle("work"));
        assert!(!graph.in_cycle("fail"));

        // check is entered from init and work but sits in a cycle
        let check = graph.get_task("check").unwrap();
        assert!(check.split);
        assert!(check.splits.is_empty());
    }

    #[test]
    fn test_distinct_conditions_keep_both_edges() {
        let graph = build(
            r#"
version: '2.0'
conditions:
  tasks:
    a:
      on-success: [b]
      on-error: [b]
    b: {}
"#,
        );

        let seqs = graph.has_sequence("a", "b", None);
        assert_eq!(seqs.len(), 2);
        assert!(seqs[0].criteria.ends_with(r#"["SUCCESS"]"#));
        assert!(seqs[1].criteria.ends_with(r#"["ERROR"]"#));
    }
}
