//! TaskManager - actor that owns the TaskEngine
//!
//! Processes commands via channels so many async callers share one engine
//! without locks. Each command runs to completion before the next is taken.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use crate::engine::{
    AverageCompletionTime, BatchReport, BatchUpdateItem, CompletionRate, StatusCount, TagCount, TaskEngine, TaskPage,
    TaskQuery,
};
use crate::error::{TaskError, TaskResult};

use super::messages::TaskCommand;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Event broadcast after a mutation commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A task was created, singly or as part of a batch
    Created { id: TaskId },
    /// A task was updated
    Updated { id: TaskId, status: TaskStatus },
    /// A task was deleted
    Deleted { id: TaskId },
}

/// Handle to send commands to the TaskManager
#[derive(Debug, Clone)]
pub struct TaskManager {
    tx: mpsc::Sender<TaskCommand>,
    /// Broadcast sender for change notifications
    event_tx: broadcast::Sender<TaskEvent>,
}

impl TaskManager {
    /// Spawn a TaskManager actor with default channel sizes
    pub fn spawn(engine: TaskEngine) -> Self {
        Self::spawn_with_capacity(engine, DEFAULT_CHANNEL_CAPACITY, DEFAULT_EVENT_CAPACITY)
    }

    /// Spawn a TaskManager actor
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_with_capacity(engine: TaskEngine, channel_capacity: usize, event_capacity: usize) -> Self {
        debug!(channel_capacity, event_capacity, "spawn: called");
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));

        tokio::spawn(actor_loop(engine, rx));

        info!("TaskManager spawned");
        Self { tx, event_tx }
    }

    /// Subscribe to change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Send a command and wait for its reply
    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> TaskCommand) -> TaskResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| TaskError::ChannelError)?;
        reply_rx.await.map_err(|_| TaskError::ChannelError)
    }

    fn emit(&self, event: TaskEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }

    // === Single task operations ===

    /// Create a task
    pub async fn create_task(&self, input: NewTask) -> TaskResult<Task> {
        debug!(id = ?input.id, "create_task: called");
        let task = self.call(|reply| TaskCommand::Create { input, reply }).await??;
        self.emit(TaskEvent::Created { id: task.id });
        Ok(task)
    }

    /// Get a task by id
    pub async fn get_task(&self, id: TaskId) -> TaskResult<Task> {
        debug!(%id, "get_task: called");
        self.call(|reply| TaskCommand::Get { id, reply }).await?
    }

    /// Apply a partial update to a task
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        debug!(%id, "update_task: called");
        let task = self.call(|reply| TaskCommand::Update { id, patch, reply }).await??;
        self.emit(TaskEvent::Updated {
            id: task.id,
            status: task.status,
        });
        Ok(task)
    }

    /// Delete a task nothing depends on
    pub async fn delete_task(&self, id: TaskId) -> TaskResult<Task> {
        debug!(%id, "delete_task: called");
        let task = self.call(|reply| TaskCommand::Delete { id, reply }).await??;
        self.emit(TaskEvent::Deleted { id });
        Ok(task)
    }

    // === Queries ===

    /// Filter, sort and paginate
    pub async fn list_tasks(&self, query: TaskQuery) -> TaskResult<TaskPage> {
        debug!(?query, "list_tasks: called");
        self.call(|reply| TaskCommand::List { query, reply }).await?
    }

    /// Case-insensitive substring search over title and description
    pub async fn search_tasks(&self, query: impl Into<String>) -> TaskResult<Vec<Task>> {
        let query = query.into();
        debug!(%query, "search_tasks: called");
        self.call(|reply| TaskCommand::Search { query, reply }).await?
    }

    /// Task ids ordered dependencies-first
    pub async fn topological_order(&self) -> TaskResult<Vec<TaskId>> {
        debug!("topological_order: called");
        self.call(|reply| TaskCommand::TopologicalOrder { reply }).await
    }

    // === Batch operations ===

    /// Create every item or none
    pub async fn batch_create(&self, items: Vec<NewTask>) -> TaskResult<Vec<Task>> {
        debug!(count = items.len(), "batch_create: called");
        let created = self.call(|reply| TaskCommand::BatchCreate { items, reply }).await??;
        for task in &created {
            self.emit(TaskEvent::Created { id: task.id });
        }
        Ok(created)
    }

    /// Apply each update independently
    pub async fn batch_update(&self, items: Vec<BatchUpdateItem>) -> TaskResult<BatchReport<Task>> {
        debug!(count = items.len(), "batch_update: called");
        let report = self.call(|reply| TaskCommand::BatchUpdate { items, reply }).await??;
        for task in &report.succeeded {
            self.emit(TaskEvent::Updated {
                id: task.id,
                status: task.status,
            });
        }
        Ok(report)
    }

    /// Delete every id or none
    pub async fn batch_delete(&self, ids: Vec<TaskId>) -> TaskResult<Vec<TaskId>> {
        debug!(count = ids.len(), "batch_delete: called");
        let deleted = self.call(|reply| TaskCommand::BatchDelete { ids, reply }).await??;
        for &id in &deleted {
            self.emit(TaskEvent::Deleted { id });
        }
        Ok(deleted)
    }

    // === Analytics ===

    pub async fn completion_rate(&self) -> TaskResult<CompletionRate> {
        debug!("completion_rate: called");
        self.call(|reply| TaskCommand::CompletionRate { reply }).await
    }

    pub async fn average_completion_time(&self) -> TaskResult<AverageCompletionTime> {
        debug!("average_completion_time: called");
        self.call(|reply| TaskCommand::AverageCompletionTime { reply }).await
    }

    pub async fn popular_tags(&self) -> TaskResult<Vec<TagCount>> {
        debug!("popular_tags: called");
        self.call(|reply| TaskCommand::PopularTags { reply }).await
    }

    pub async fn status_breakdown(&self) -> TaskResult<Vec<StatusCount>> {
        debug!("status_breakdown: called");
        self.call(|reply| TaskCommand::StatusBreakdown { reply }).await
    }

    /// Shutdown the TaskManager
    pub async fn shutdown(&self) -> TaskResult<()> {
        debug!("shutdown: called");
        self.tx
            .send(TaskCommand::Shutdown)
            .await
            .map_err(|_| TaskError::ChannelError)
    }
}

/// The actor loop that owns the engine
async fn actor_loop(mut engine: TaskEngine, mut rx: mpsc::Receiver<TaskCommand>) {
    debug!("TaskManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            TaskCommand::Create { input, reply } => {
                debug!("actor_loop: Create command");
                let _ = reply.send(engine.create_task(input));
            }

            TaskCommand::Get { id, reply } => {
                debug!(%id, "actor_loop: Get command");
                let _ = reply.send(engine.get_task(id));
            }

            TaskCommand::Update { id, patch, reply } => {
                debug!(%id, "actor_loop: Update command");
                let _ = reply.send(engine.update_task(id, patch));
            }

            TaskCommand::Delete { id, reply } => {
                debug!(%id, "actor_loop: Delete command");
                let _ = reply.send(engine.delete_task(id));
            }

            TaskCommand::List { query, reply } => {
                debug!("actor_loop: List command");
                let _ = reply.send(engine.list_tasks(&query));
            }

            TaskCommand::Search { query, reply } => {
                debug!(%query, "actor_loop: Search command");
                let _ = reply.send(engine.search_tasks(&query));
            }

            TaskCommand::TopologicalOrder { reply } => {
                debug!("actor_loop: TopologicalOrder command");
                let _ = reply.send(engine.topological_order());
            }

            TaskCommand::BatchCreate { items, reply } => {
                debug!(count = items.len(), "actor_loop: BatchCreate command");
                let _ = reply.send(engine.batch_create(items));
            }

            TaskCommand::BatchUpdate { items, reply } => {
                debug!(count = items.len(), "actor_loop: BatchUpdate command");
                let _ = reply.send(engine.batch_update(items));
            }

            TaskCommand::BatchDelete { ids, reply } => {
                debug!(count = ids.len(), "actor_loop: BatchDelete command");
                let _ = reply.send(engine.batch_delete(ids));
            }

            TaskCommand::CompletionRate { reply } => {
                let _ = reply.send(engine.completion_rate());
            }

            TaskCommand::AverageCompletionTime { reply } => {
                let _ = reply.send(engine.average_completion_time());
            }

            TaskCommand::PopularTags { reply } => {
                let _ = reply.send(engine.popular_tags());
            }

            TaskCommand::StatusBreakdown { reply } => {
                let _ = reply.send(engine.status_breakdown());
            }

            TaskCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("TaskManager shutting down");
                break;
            }
        }
    }

    debug!("TaskManager actor stopped");
}
