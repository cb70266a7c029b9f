//! Synchronous task engine
//!
//! `TaskEngine` owns the store and wires the entity rules, dependency
//! validator, query pipeline, batch executor and analytics together. It is
//! single-owner; `state::TaskManager` puts it behind an actor for shared use.

pub mod analytics;
pub mod batch;
pub mod dependency;
pub mod query;
mod store;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::domain::{NewTask, Task, TaskId, TaskPatch};
use crate::error::TaskResult;

pub use analytics::{AverageCompletionTime, CompletionRate, StatusCount, TagCount};
pub use batch::{BatchReport, BatchUpdateItem};
pub use query::{PageLimits, PageRequest, Pagination, SortField, SortOrder, SortSpec, TaskFilter, TaskPage, TaskQuery};
pub use store::TaskStore;

/// Tunables for queries and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub page_limits: PageLimits,
    pub popular_tags_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_limits: PageLimits::default(),
            popular_tags_limit: analytics::DEFAULT_POPULAR_TAGS_LIMIT,
        }
    }
}

/// Create a task inside `store`, validating entity and graph rules first
///
/// The id is only claimed once every check has passed, so a rejected create
/// consumes nothing.
pub(crate) fn create_in(store: &mut TaskStore, input: NewTask, now: DateTime<Utc>) -> TaskResult<Task> {
    let id = match input.id {
        Some(id) => {
            store.ensure_available(id)?;
            id
        }
        None => store.peek_id(),
    };

    let task = Task::create(id, input, now)?;
    dependency::validate_write(store, None, &task)?;
    store.insert(task.clone())?;
    Ok(task)
}

/// Apply a patch to a stored task, validating entity and graph rules first
pub(crate) fn update_in(store: &mut TaskStore, id: TaskId, patch: &TaskPatch, now: DateTime<Utc>) -> TaskResult<Task> {
    let previous = store.get(id)?;
    let mut candidate = previous.clone();
    candidate.apply_update(patch, now)?;
    dependency::validate_write(store, Some(previous), &candidate)?;

    let stored = store.get_mut(id)?;
    *stored = candidate;
    Ok(stored.clone())
}

/// Single-owner task engine
#[derive(Debug)]
pub struct TaskEngine {
    store: TaskStore,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl Default for TaskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskEngine {
    /// Engine on the system clock with default settings
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TaskStore::new(),
            clock,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Read view of the store
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // === Single task operations ===

    pub fn create_task(&mut self, input: NewTask) -> TaskResult<Task> {
        debug!(?input, "create_task: called");
        let now = self.now();
        let task = create_in(&mut self.store, input, now)?;
        info!(id = %task.id, title = %task.title, "Task created");
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> TaskResult<Task> {
        debug!(%id, "get_task: called");
        self.store.get(id).cloned()
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        debug!(%id, ?patch, "update_task: called");
        let now = self.now();
        let task = update_in(&mut self.store, id, &patch, now)?;
        info!(%id, status = %task.status, "Task updated");
        Ok(task)
    }

    pub fn delete_task(&mut self, id: TaskId) -> TaskResult<Task> {
        debug!(%id, "delete_task: called");
        let task = self.store.delete(id)?;
        info!(%id, "Task deleted");
        Ok(task)
    }

    // === Queries ===

    pub fn list_tasks(&self, query: &TaskQuery) -> TaskResult<TaskPage> {
        query::list(&self.store, query, &self.settings.page_limits)
    }

    pub fn search_tasks(&self, query: &str) -> TaskResult<Vec<Task>> {
        query::search(&self.store, query)
    }

    /// Task ids ordered dependencies-first
    pub fn topological_order(&self) -> Vec<TaskId> {
        // Writes keep the graph acyclic, so the cycle branch is unreachable
        dependency::topological_order(&self.store).unwrap_or_else(|cycle| {
            tracing::error!(?cycle, "topological_order: stored graph has a cycle");
            Vec::new()
        })
    }

    // === Batch operations ===

    pub fn batch_create(&mut self, items: Vec<NewTask>) -> TaskResult<Vec<Task>> {
        let now = self.now();
        let created = batch::batch_create(&mut self.store, items, now)?;
        debug_assert!(dependency::validate_graph(&self.store).is_ok());
        Ok(created)
    }

    pub fn batch_update(&mut self, items: Vec<BatchUpdateItem>) -> TaskResult<BatchReport<Task>> {
        let now = self.now();
        let report = batch::batch_update(&mut self.store, items, now)?;
        debug_assert!(dependency::validate_graph(&self.store).is_ok());
        Ok(report)
    }

    pub fn batch_delete(&mut self, ids: Vec<TaskId>) -> TaskResult<Vec<TaskId>> {
        batch::batch_delete(&mut self.store, ids)
    }

    // === Analytics ===

    pub fn completion_rate(&self) -> CompletionRate {
        analytics::completion_rate(&self.store)
    }

    pub fn average_completion_time(&self) -> AverageCompletionTime {
        analytics::average_completion_time(&self.store)
    }

    pub fn popular_tags(&self) -> Vec<TagCount> {
        analytics::popular_tags(&self.store, self.settings.popular_tags_limit)
    }

    pub fn status_breakdown(&self) -> Vec<StatusCount> {
        analytics::status_breakdown(&self.store)
    }
}
