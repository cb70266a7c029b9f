//! Task engine error types

use thiserror::Error;

use crate::domain::{TaskId, TaskStatus, format_path, join_ids};

/// Errors returned by task engine operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("Validation failed: {}", .details.join("; "))]
    Validation { details: Vec<String> },

    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Dependency cycle for task {id}: {}", format_path(.cycle))]
    CyclicDependency { id: TaskId, cycle: Vec<TaskId> },

    #[error("Task {id} has incomplete dependencies: {}", join_ids(.incomplete))]
    IncompleteDependencies { id: TaskId, incomplete: Vec<TaskId> },

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task {id} is a dependency of: {}", join_ids(.dependents))]
    HasDependents { id: TaskId, dependents: Vec<TaskId> },

    #[error("Task id already taken: {0}")]
    DuplicateId(TaskId),

    #[error("Batch rejected: {} of its items failed", .failures.len())]
    BatchRejected { failures: Vec<ItemFailure> },

    #[error("Channel error")]
    ChannelError,
}

impl TaskError {
    /// Build a validation error with a single detail
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            details: vec![detail.into()],
        }
    }

    /// Stable name of the error kind, used by adapters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::InvalidTransition { .. } => "InvalidTransitionError",
            Self::CyclicDependency { .. } => "CyclicDependencyError",
            Self::IncompleteDependencies { .. } => "IncompleteDependenciesError",
            Self::NotFound(_) => "NotFoundError",
            Self::HasDependents { .. } => "HasDependentsError",
            Self::DuplicateId(_) => "DuplicateIdError",
            Self::BatchRejected { .. } => "BatchRejectedError",
            Self::ChannelError => "ChannelError",
        }
    }
}

/// One failed item of a batch operation
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    /// Position of the item in the batch input
    pub index: usize,
    /// Task the item referred to, when known
    pub id: Option<TaskId>,
    /// Why the item failed
    pub error: TaskError,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "item {} (task {}): {}", self.index, id, self.error),
            None => write!(f, "item {}: {}", self.index, self.error),
        }
    }
}

/// Result type for task engine operations
pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TaskError::Validation {
            details: vec!["title is required".to_string(), "tags is required".to_string()],
        };
        assert_eq!(err.to_string(), "Validation failed: title is required; tags is required");

        let err = TaskError::CyclicDependency {
            id: TaskId::new(1),
            cycle: vec![TaskId::new(1), TaskId::new(2), TaskId::new(1)],
        };
        assert_eq!(err.to_string(), "Dependency cycle for task 1: 1 -> 2 -> 1");

        let err = TaskError::InvalidTransition {
            from: TaskStatus::Pending,
            to: TaskStatus::Archived,
        };
        assert!(err.to_string().contains("pending to archived"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(TaskError::validation("x").kind(), "ValidationError");
        assert_eq!(TaskError::NotFound(TaskId::new(3)).kind(), "NotFoundError");
        assert_eq!(TaskError::DuplicateId(TaskId::new(3)).kind(), "DuplicateIdError");
    }

    #[test]
    fn test_item_failure_display() {
        let failure = ItemFailure {
            index: 2,
            id: Some(TaskId::new(9)),
            error: TaskError::NotFound(TaskId::new(9)),
        };
        assert_eq!(failure.to_string(), "item 2 (task 9): Task not found: 9");
    }
}
