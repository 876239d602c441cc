// Guard expressions attached to workflow sequences

use crate::types::{Condition, TaskState};

/// Builds the guard expression stored on a sequence.
///
/// The expression is opaque to the composer: it is stored on the edge and
/// evaluated later by the runtime engine against live task state.
pub trait CriteriaBuilder: Send + Sync {
    /// Guard that holds when `task_name` reached a state accepted by
    /// `condition` and, if given, `expr` holds as well
    fn compose(&self, task_name: &str, condition: Condition, expr: Option<&str>) -> String;
}

/// YAQL guard builder, e.g. `task(a).get(state, "UNKNOWN") in ["SUCCESS"]`
#[derive(Debug, Clone, Copy, Default)]
pub struct YaqlCriteria;

impl CriteriaBuilder for YaqlCriteria {
    fn compose(&self, task_name: &str, condition: Condition, expr: Option<&str>) -> String {
        let states = condition
            .states()
            .iter()
            .map(|state| format!("\"{}\"", state))
            .collect::<Vec<_>>()
            .join(", ");

        let mut criteria = format!(
            "task({}).get(state, \"{}\") in [{}]",
            task_name,
            TaskState::Unknown,
            states
        );

        if let Some(expr) = expr.map(strip_delimiter).filter(|e| !e.is_empty()) {
            criteria.push_str(&format!(" and ({})", expr));
        }

        criteria
    }
}

/// Strip `<% %>` or `{{ }}` delimiters from an expression
pub fn strip_delimiter(expr: &str) -> &str {
    let expr = expr.trim();

    [("<%", "%>"), ("{{", "}}")]
        .iter()
        .find_map(|&(open, close)| {
            expr.strip_prefix(open)
                .and_then(|inner| inner.strip_suffix(close))
        })
        .map(str::trim)
        .unwrap_or(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_on_success() {
        let criteria = YaqlCriteria.compose("task1", Condition::OnSuccess, None);
        assert_eq!(
            criteria,
            r#"task(task1).get(state, "UNKNOWN") in ["SUCCESS"]"#
        );
    }

    #[test]
    fn test_compose_on_complete() {
        let criteria = YaqlCriteria.compose("task1", Condition::OnComplete, None);
        assert_eq!(
            criteria,
            r#"task(task1).get(state, "UNKNOWN") in ["SUCCESS", "ERROR"]"#
        );
    }

    #[test]
    fn test_compose_with_expression() {
        let criteria =
            YaqlCriteria.compose("task1", Condition::OnError, Some("<% $.retry = true %>"));
        assert_eq!(
            criteria,
            r#"task(task1).get(state, "UNKNOWN") in ["ERROR"] and ($.retry = true)"#
        );
    }

    #[test]
    fn test_compose_ignores_empty_expression() {
        let plain = YaqlCriteria.compose("task1", Condition::OnSuccess, None);
        assert_eq!(YaqlCriteria.compose("task1", Condition::OnSuccess, Some("")), plain);
        assert_eq!(
            YaqlCriteria.compose("task1", Condition::OnSuccess, Some("<% %>")),
            plain
        );
    }

    #[test]
    fn test_strip_delimiter() {
        assert_eq!(strip_delimiter("<% $.x > 1 %>"), "$.x > 1");
        assert_eq!(strip_delimiter("{{ ctx.x }}"), "ctx.x");
        assert_eq!(strip_delimiter("  $.x  "), "$.x");
        assert_eq!(strip_delimiter("<% unterminated"), "<% unterminated");
    }
}
