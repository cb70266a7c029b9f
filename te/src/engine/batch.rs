//! Batch operations
//!
//! - create: all-or-nothing over a staged copy of the store
//! - update: per-item; passing items commit, failures are reported
//! - delete: all-or-nothing over a staged copy of the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{NewTask, Task, TaskId, TaskPatch};
use crate::error::{ItemFailure, TaskError, TaskResult};

use super::store::TaskStore;
use super::{create_in, update_in};

/// One item of a batch update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateItem {
    pub id: TaskId,
    #[serde(flatten)]
    pub patch: TaskPatch,
}

impl BatchUpdateItem {
    pub fn new(id: TaskId, patch: TaskPatch) -> Self {
        Self { id, patch }
    }
}

/// Outcome of a batch that commits item by item
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    /// Committed results, in input order
    pub succeeded: Vec<T>,
    /// Rejected items, in input order
    pub failed: Vec<ItemFailure>,
}

impl<T> BatchReport<T> {
    /// Check if every item was committed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn ensure_not_empty(len: usize) -> TaskResult<()> {
    if len == 0 {
        return Err(TaskError::validation("batch must contain at least one item"));
    }
    Ok(())
}

/// Create every item or none
///
/// Items are validated in order against a staged copy, so an item may depend
/// on an earlier item of the same batch through a client-supplied id. Every
/// failing item is reported, not only the first.
pub fn batch_create(store: &mut TaskStore, items: Vec<NewTask>, now: DateTime<Utc>) -> TaskResult<Vec<Task>> {
    debug!(count = items.len(), "batch_create: called");
    ensure_not_empty(items.len())?;

    let mut staged = store.clone();
    let mut created = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let requested = item.id;
        match create_in(&mut staged, item, now) {
            Ok(task) => created.push(task),
            Err(error) => {
                warn!(index, error = %error, "batch_create: item rejected");
                failures.push(ItemFailure {
                    index,
                    id: requested,
                    error,
                });
            }
        }
    }

    if !failures.is_empty() {
        info!(failed = failures.len(), "batch_create: batch rejected, nothing committed");
        return Err(TaskError::BatchRejected { failures });
    }

    *store = staged;
    info!(count = created.len(), "batch_create: committed");
    Ok(created)
}

/// Apply each update independently
///
/// Later items observe earlier successes from the same batch.
pub fn batch_update(
    store: &mut TaskStore,
    items: Vec<BatchUpdateItem>,
    now: DateTime<Utc>,
) -> TaskResult<BatchReport<Task>> {
    debug!(count = items.len(), "batch_update: called");
    ensure_not_empty(items.len())?;

    let mut report = BatchReport {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };

    for (index, item) in items.into_iter().enumerate() {
        match update_in(store, item.id, &item.patch, now) {
            Ok(task) => report.succeeded.push(task),
            Err(error) => {
                warn!(index, id = %item.id, error = %error, "batch_update: item rejected");
                report.failed.push(ItemFailure {
                    index,
                    id: Some(item.id),
                    error,
                });
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "batch_update: complete"
    );
    Ok(report)
}

/// Delete every id or none
///
/// Each id passes the single-delete gate in input order, so deleting a
/// dependent before its dependency in the same batch is accepted.
pub fn batch_delete(store: &mut TaskStore, ids: Vec<TaskId>) -> TaskResult<Vec<TaskId>> {
    debug!(count = ids.len(), "batch_delete: called");
    ensure_not_empty(ids.len())?;

    let mut staged = store.clone();
    let mut deleted = Vec::with_capacity(ids.len());
    let mut failures = Vec::new();

    for (index, id) in ids.into_iter().enumerate() {
        match staged.delete(id) {
            Ok(_) => deleted.push(id),
            Err(error) => {
                warn!(index, %id, error = %error, "batch_delete: item rejected");
                failures.push(ItemFailure {
                    index,
                    id: Some(id),
                    error,
                });
            }
        }
    }

    if !failures.is_empty() {
        info!(failed = failures.len(), "batch_delete: batch rejected, nothing deleted");
        return Err(TaskError::BatchRejected { failures });
    }

    *store = staged;
    info!(count = deleted.len(), "batch_delete: committed");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn valid(title: &str) -> NewTask {
        NewTask::new(title, now() + Duration::days(1), ["batch"])
    }

    fn invalid(title: &str) -> NewTask {
        NewTask::new(title, now() - Duration::days(1), ["batch"])
    }

    #[test]
    fn test_batch_create_commits_with_increasing_ids() {
        let mut store = TaskStore::new();
        let created = batch_create(&mut store, vec![valid("a"), valid("b")], now()).unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0].id < created[1].id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_batch_create_one_invalid_commits_nothing() {
        let mut store = TaskStore::new();
        let err = batch_create(&mut store, vec![valid("a"), invalid("b"), invalid("c")], now()).unwrap_err();
        match err {
            TaskError::BatchRejected { failures } => {
                let indexes: Vec<usize> = failures.iter().map(|f| f.index).collect();
                assert_eq!(indexes, vec![1, 2]);
            }
            other => panic!("expected BatchRejected, got {other:?}"),
        }
        assert!(store.is_empty());

        // Ids handed to the rejected batch were not consumed
        let created = batch_create(&mut store, vec![valid("d")], now()).unwrap();
        assert_eq!(created[0].id, TaskId::new(1));
    }

    #[test]
    fn test_batch_create_can_reference_earlier_item() {
        let mut store = TaskStore::new();
        let items = vec![
            valid("base").with_id(TaskId::new(10)),
            valid("child").with_dependencies([TaskId::new(10)]),
        ];
        let created = batch_create(&mut store, items, now()).unwrap();
        assert_eq!(created[1].dependencies, vec![TaskId::new(10)]);
        assert_eq!(created[1].id, TaskId::new(11));
    }

    #[test]
    fn test_batch_create_duplicate_client_ids() {
        let mut store = TaskStore::new();
        let items = vec![valid("a").with_id(TaskId::new(5)), valid("b").with_id(TaskId::new(5))];
        let err = batch_create(&mut store, items, now()).unwrap_err();
        match err {
            TaskError::BatchRejected { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].error, TaskError::DuplicateId(TaskId::new(5)));
            }
            other => panic!("expected BatchRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_batches_rejected() {
        let mut store = TaskStore::new();
        assert!(matches!(batch_create(&mut store, vec![], now()), Err(TaskError::Validation { .. })));
        assert!(matches!(batch_update(&mut store, vec![], now()), Err(TaskError::Validation { .. })));
        assert!(matches!(batch_delete(&mut store, vec![]), Err(TaskError::Validation { .. })));
    }

    #[test]
    fn test_batch_update_partial_success() {
        let mut store = TaskStore::new();
        batch_create(&mut store, vec![valid("a"), valid("b")], now()).unwrap();

        let items = vec![
            BatchUpdateItem::new(TaskId::new(1), TaskPatch::status(TaskStatus::InProgress)),
            BatchUpdateItem::new(TaskId::new(99), TaskPatch::status(TaskStatus::InProgress)),
            BatchUpdateItem::new(TaskId::new(2), TaskPatch::status(TaskStatus::Archived)),
            BatchUpdateItem::new(TaskId::new(1), TaskPatch::status(TaskStatus::Completed)),
        ];
        let report = batch_update(&mut store, items, now()).unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.succeeded.len(), 2);
        let failed: Vec<(usize, &TaskError)> = report.failed.iter().map(|f| (f.index, &f.error)).collect();
        assert_eq!(failed[0], (1, &TaskError::NotFound(TaskId::new(99))));
        assert_eq!(failed[1].0, 2);
        assert_eq!(store.get(TaskId::new(1)).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.get(TaskId::new(2)).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_batch_delete_is_atomic() {
        let mut store = TaskStore::new();
        batch_create(&mut store, vec![valid("a"), valid("b").with_dependencies([TaskId::new(1)]), valid("c")], now())
            .unwrap();

        let err = batch_delete(&mut store, vec![TaskId::new(3), TaskId::new(1)]).unwrap_err();
        assert!(matches!(err, TaskError::BatchRejected { .. }));
        assert_eq!(store.len(), 3);

        let err = batch_delete(&mut store, vec![TaskId::new(3), TaskId::new(42)]).unwrap_err();
        assert!(matches!(err, TaskError::BatchRejected { .. }));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_batch_delete_dependent_first_succeeds() {
        let mut store = TaskStore::new();
        batch_create(&mut store, vec![valid("a"), valid("b").with_dependencies([TaskId::new(1)])], now()).unwrap();

        let deleted = batch_delete(&mut store, vec![TaskId::new(2), TaskId::new(1)]).unwrap();
        assert_eq!(deleted, vec![TaskId::new(2), TaskId::new(1)]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_update_item_deserializes_flat() {
        let item: BatchUpdateItem = serde_json::from_str(r#"{"id": 3, "status": "in_progress"}"#).unwrap();
        assert_eq!(item.id, TaskId::new(3));
        assert_eq!(item.patch.status, Some(TaskStatus::InProgress));
    }
}
