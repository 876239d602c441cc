use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime state of a task, as referenced by transition criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// No state recorded yet. Satisfies no transition condition.
    Unknown,
    Success,
    Error,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition under which a transition to the next task is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "on-success")]
    OnSuccess,
    #[serde(rename = "on-error")]
    OnError,
    #[serde(rename = "on-complete")]
    OnComplete,
}

impl Condition {
    /// All conditions, in the order transitions are reported
    pub const ALL: [Condition; 3] = [Self::OnSuccess, Self::OnError, Self::OnComplete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnSuccess => "on-success",
            Self::OnError => "on-error",
            Self::OnComplete => "on-complete",
        }
    }

    /// Predecessor states that make a transition with this condition live
    pub fn states(&self) -> &'static [TaskState] {
        match self {
            Self::OnSuccess => &[TaskState::Success],
            Self::OnError => &[TaskState::Error],
            Self::OnComplete => &[TaskState::Success, TaskState::Error],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many inbound branches a join task waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJoinPolicy", into = "RawJoinPolicy")]
pub enum JoinPolicy {
    /// Wait for every inbound branch
    All,
    /// Wait for the given number of inbound branches
    Count(u32),
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Count(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawJoinPolicy {
    Count(u32),
    Keyword(String),
}

impl TryFrom<RawJoinPolicy> for JoinPolicy {
    type Error = String;

    fn try_from(raw: RawJoinPolicy) -> Result<Self, Self::Error> {
        match raw {
            RawJoinPolicy::Keyword(keyword) if keyword == "all" => Ok(Self::All),
            RawJoinPolicy::Keyword(keyword) => {
                Err(format!("invalid join policy '{}', expected 'all' or a count", keyword))
            }
            RawJoinPolicy::Count(0) => Err("join count must be greater than zero".to_string()),
            RawJoinPolicy::Count(n) => Ok(Self::Count(n)),
        }
    }
}

impl From<JoinPolicy> for RawJoinPolicy {
    fn from(policy: JoinPolicy) -> Self {
        match policy {
            JoinPolicy::All => Self::Keyword("all".to_string()),
            JoinPolicy::Count(n) => Self::Count(n),
        }
    }
}

/// A branch instance created by a split task in the execution graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitInstance {
    /// Name of the split task
    pub task: String,
    /// Instance id, unique per split task within one expansion
    pub id: u32,
}

impl SplitInstance {
    pub fn new(task: impl Into<String>, id: u32) -> Self {
        Self {
            task: task.into(),
            id,
        }
    }
}

impl fmt::Display for SplitInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.task, self.id)
    }
}
