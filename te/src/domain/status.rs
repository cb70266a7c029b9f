//! Task status and its transition graph
//!
//! ```text
//! pending -> in_progress -> completed -> archived
//! ```
//!
//! Every edge is one-way, no state may be skipped and `archived` is terminal.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not started
    #[default]
    Pending,
    /// Being worked on
    #[serde(alias = "in-progress")]
    InProgress,
    /// Done; all dependencies were completed first
    Completed,
    /// Retired, terminal
    Archived,
}

impl TaskStatus {
    /// All statuses in lifecycle order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Archived,
    ];

    /// The single legal next status, if any
    pub fn successor(self) -> Option<TaskStatus> {
        match self {
            Self::Pending => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => Some(Self::Archived),
            Self::Archived => None,
        }
    }

    /// Whether `next` is the legal successor of this status
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        self.successor() == Some(next)
    }

    /// Check if no further transition is possible
    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_forward_edges_only() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Completed.can_transition_to(TaskStatus::Archived));

        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Archived));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn test_archived_is_terminal() {
        assert!(TaskStatus::Archived.is_terminal());
        for status in TaskStatus::ALL {
            assert!(!TaskStatus::Archived.can_transition_to(status));
        }
    }

    #[test]
    fn test_status_parse_accepts_hyphenated_alias() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in_progress\"");
        let status: TaskStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
    }

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(TaskStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_transitions_follow_lifecycle_order(from in any_status(), to in any_status()) {
            let rank = |s: TaskStatus| TaskStatus::ALL.iter().position(|x| *x == s).unwrap();
            prop_assert_eq!(from.can_transition_to(to), rank(to) == rank(from) + 1);
        }

        #[test]
        fn prop_same_state_is_never_a_transition(status in any_status()) {
            prop_assert!(!status.can_transition_to(status));
        }
    }
}
