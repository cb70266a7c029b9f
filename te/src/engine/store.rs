//! TaskStore - owning container for tasks
//!
//! Keeps tasks in insertion order and hands out monotonic identifiers.
//! Identifiers are never reused, even after the task that held one is deleted.

use std::collections::HashMap;
use tracing::debug;

use crate::domain::{Task, TaskId};
use crate::error::{TaskError, TaskResult};

/// In-memory task store
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    /// Insertion order; the canonical order of `list`
    order: Vec<TaskId>,
    /// Lowest identifier never issued or reserved
    next_id: TaskId,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create an empty store; the first identifier is 1
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            next_id: TaskId::new(1),
        }
    }

    /// Issue the next identifier
    #[cfg(test)]
    pub(crate) fn allocate_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id = Self::successor(id).unwrap();
        id
    }

    /// The identifier the next auto-assigned create receives
    pub fn peek_id(&self) -> TaskId {
        self.next_id
    }

    /// Identifier after `id`; the last representable id can never be stored
    /// because nothing could follow it
    fn successor(id: TaskId) -> TaskResult<TaskId> {
        id.next()
            .ok_or_else(|| TaskError::validation(format!("task id {id} is out of range")))
    }

    /// Check that a client-supplied identifier can be used
    ///
    /// Fails with `DuplicateId` if the id is live or was ever issued before,
    /// and with a validation error if no identifier could follow it.
    pub fn ensure_available(&self, id: TaskId) -> TaskResult<()> {
        if id < self.next_id || self.tasks.contains_key(&id) {
            debug!(%id, next_id = %self.next_id, "TaskStore::ensure_available: id already taken");
            return Err(TaskError::DuplicateId(id));
        }
        Self::successor(id)?;
        Ok(())
    }

    /// Add a task
    pub fn insert(&mut self, task: Task) -> TaskResult<()> {
        debug!(id = %task.id, "TaskStore::insert: called");
        if self.tasks.contains_key(&task.id) {
            return Err(TaskError::DuplicateId(task.id));
        }
        if task.id >= self.next_id {
            self.next_id = Self::successor(task.id)?;
        }
        self.order.push(task.id);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Look up a task
    pub fn get(&self, id: TaskId) -> TaskResult<&Task> {
        self.tasks.get(&id).ok_or(TaskError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> TaskResult<&mut Task> {
        self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))
    }

    /// Check if a task exists
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Tasks whose dependencies include `id`, in insertion order
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.list().filter(|t| t.depends_on(id)).map(|t| t.id).collect()
    }

    /// Remove a task that nothing depends on
    pub fn delete(&mut self, id: TaskId) -> TaskResult<Task> {
        debug!(%id, "TaskStore::delete: called");
        if !self.contains(id) {
            return Err(TaskError::NotFound(id));
        }

        let dependents = self.dependents_of(id);
        if !dependents.is_empty() {
            debug!(%id, ?dependents, "TaskStore::delete: task has dependents");
            return Err(TaskError::HasDependents { id, dependents });
        }

        self.order.retain(|existing| *existing != id);
        self.tasks.remove(&id).ok_or(TaskError::NotFound(id))
    }

    /// All tasks in insertion order
    ///
    /// The iterator borrows the store; call again to restart.
    pub fn list(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use chrono::{Duration, TimeZone, Utc};

    fn task(store: &mut TaskStore, title: &str, deps: &[u64]) -> TaskId {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let id = store.allocate_id();
        let input = NewTask::new(title, now + Duration::days(1), ["t"])
            .with_dependencies(deps.iter().copied().map(TaskId::new));
        store.insert(Task::create(id, input, now).unwrap()).unwrap();
        id
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = TaskStore::new();
        let id = task(&mut store, "First", &[]);
        assert_eq!(id, TaskId::new(1));
        assert_eq!(store.get(id).unwrap().title, "First");
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get(TaskId::new(99)), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut store = TaskStore::new();
        let id = task(&mut store, "First", &[]);
        let copy = store.get(id).unwrap().clone();
        assert_eq!(store.insert(copy), Err(TaskError::DuplicateId(id)));
    }

    #[test]
    fn test_list_preserves_insertion_order_and_restarts() {
        let mut store = TaskStore::new();
        task(&mut store, "a", &[]);
        task(&mut store, "b", &[]);
        task(&mut store, "c", &[]);
        store.delete(TaskId::new(2)).unwrap();

        let titles: Vec<_> = store.list().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
        assert_eq!(store.list().count(), 2);
    }

    #[test]
    fn test_delete_rejects_task_with_dependents() {
        let mut store = TaskStore::new();
        let base = task(&mut store, "base", &[]);
        let child = task(&mut store, "child", &[1]);

        let err = store.delete(base).unwrap_err();
        assert_eq!(
            err,
            TaskError::HasDependents {
                id: base,
                dependents: vec![child]
            }
        );
        assert!(store.contains(base));

        store.delete(child).unwrap();
        store.delete(base).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing() {
        let mut store = TaskStore::new();
        assert_eq!(store.delete(TaskId::new(1)), Err(TaskError::NotFound(TaskId::new(1))));
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut store = TaskStore::new();
        let first = task(&mut store, "a", &[]);
        store.delete(first).unwrap();
        let second = task(&mut store, "b", &[]);
        assert!(second > first);
        assert_eq!(store.ensure_available(first), Err(TaskError::DuplicateId(first)));
    }

    #[test]
    fn test_insert_with_client_id_moves_counter_past_it() {
        let mut store = TaskStore::new();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let input = NewTask::new("client", now + Duration::days(1), ["t"]);
        assert!(store.ensure_available(TaskId::new(10)).is_ok());
        store.insert(Task::create(TaskId::new(10), input, now).unwrap()).unwrap();

        assert_eq!(store.peek_id(), TaskId::new(11));
        assert_eq!(store.allocate_id(), TaskId::new(11));
        assert!(store.ensure_available(TaskId::new(5)).is_err());
    }

    #[test]
    fn test_last_id_cannot_be_taken() {
        let mut store = TaskStore::new();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let last = TaskId::new(u64::MAX);
        assert_eq!(store.ensure_available(last).unwrap_err().kind(), "ValidationError");

        let input = NewTask::new("edge", now + Duration::days(1), ["t"]);
        let err = store.insert(Task::create(last, input, now).unwrap()).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(store.is_empty());
        assert_eq!(store.peek_id(), TaskId::new(1));
    }

    #[test]
    fn test_exhausted_counter_refuses_inserts() {
        let mut store = TaskStore::new();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let near = TaskId::new(u64::MAX - 1);
        store.ensure_available(near).unwrap();
        store
            .insert(Task::create(near, NewTask::new("near", now + Duration::days(1), ["t"]), now).unwrap())
            .unwrap();
        assert_eq!(store.peek_id(), TaskId::new(u64::MAX));

        let last = store.peek_id();
        let input = NewTask::new("next", now + Duration::days(1), ["t"]);
        let err = store.insert(Task::create(last, input, now).unwrap()).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(store.len(), 1);
    }
}
