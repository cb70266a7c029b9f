//! Task manager messages
//!
//! Commands for the actor pattern. Every command carries a oneshot reply.

use tokio::sync::oneshot;

use crate::domain::{NewTask, Task, TaskId, TaskPatch};
use crate::engine::{
    AverageCompletionTime, BatchReport, BatchUpdateItem, CompletionRate, StatusCount, TagCount, TaskPage, TaskQuery,
};
use crate::error::TaskResult;

/// Commands sent to the TaskManager actor
#[derive(Debug)]
pub enum TaskCommand {
    // Single task operations
    Create {
        input: NewTask,
        reply: oneshot::Sender<TaskResult<Task>>,
    },
    Get {
        id: TaskId,
        reply: oneshot::Sender<TaskResult<Task>>,
    },
    Update {
        id: TaskId,
        patch: TaskPatch,
        reply: oneshot::Sender<TaskResult<Task>>,
    },
    Delete {
        id: TaskId,
        reply: oneshot::Sender<TaskResult<Task>>,
    },

    // Queries
    List {
        query: TaskQuery,
        reply: oneshot::Sender<TaskResult<TaskPage>>,
    },
    Search {
        query: String,
        reply: oneshot::Sender<TaskResult<Vec<Task>>>,
    },
    TopologicalOrder {
        reply: oneshot::Sender<Vec<TaskId>>,
    },

    // Batch operations
    BatchCreate {
        items: Vec<NewTask>,
        reply: oneshot::Sender<TaskResult<Vec<Task>>>,
    },
    BatchUpdate {
        items: Vec<BatchUpdateItem>,
        reply: oneshot::Sender<TaskResult<BatchReport<Task>>>,
    },
    BatchDelete {
        ids: Vec<TaskId>,
        reply: oneshot::Sender<TaskResult<Vec<TaskId>>>,
    },

    // Analytics
    CompletionRate {
        reply: oneshot::Sender<CompletionRate>,
    },
    AverageCompletionTime {
        reply: oneshot::Sender<AverageCompletionTime>,
    },
    PopularTags {
        reply: oneshot::Sender<Vec<TagCount>>,
    },
    StatusBreakdown {
        reply: oneshot::Sender<Vec<StatusCount>>,
    },

    // Shutdown
    Shutdown,
}
