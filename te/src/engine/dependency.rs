//! Dependency graph validation
//!
//! Tasks form a directed graph through their `dependencies`. Writes must keep
//! it acyclic, completion is gated on every dependency being completed, and
//! deletion of a referenced task is refused (see `TaskStore::delete`).

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::domain::{Task, TaskId, TaskStatus, join_ids};
use crate::error::{TaskError, TaskResult};

use super::store::TaskStore;

/// Validate a candidate task against the store before it is written
///
/// `previous` is the stored version for updates and `None` for creation.
/// Dependency checks run when the dependency list changed; the completion
/// gate runs when the status becomes `completed`. A task being created is
/// never referenced by stored tasks, so only updates need the cycle walk.
pub fn validate_write(store: &TaskStore, previous: Option<&Task>, candidate: &Task) -> TaskResult<()> {
    debug!(id = %candidate.id, "validate_write: called");
    let deps_changed = previous.is_none_or(|p| p.dependencies != candidate.dependencies);
    if deps_changed && !candidate.dependencies.is_empty() {
        check_references(store, candidate.id, &candidate.dependencies)?;
        if previous.is_some() {
            check_acyclic(store, candidate.id, &candidate.dependencies)?;
        }
    }

    let completing = candidate.status == TaskStatus::Completed && previous.is_none_or(|p| p.status != candidate.status);
    if completing {
        check_completion(store, candidate.id, &candidate.dependencies)?;
    }
    Ok(())
}

/// Every proposed dependency must exist and must not be the task itself
pub fn check_references(store: &TaskStore, id: TaskId, proposed: &[TaskId]) -> TaskResult<()> {
    debug!(%id, ?proposed, "check_references: called");
    if proposed.contains(&id) {
        debug!(%id, "check_references: self reference");
        return Err(TaskError::CyclicDependency { id, cycle: vec![id, id] });
    }

    let unknown: Vec<TaskId> = proposed.iter().copied().filter(|dep| !store.contains(*dep)).collect();
    if !unknown.is_empty() {
        return Err(TaskError::validation(format!(
            "dependencies reference unknown tasks: {}",
            join_ids(&unknown)
        )));
    }
    Ok(())
}

/// Fail if `id` is reachable from any of its proposed dependencies
///
/// The walk follows the store's current edges. Reaching `id` ends the walk,
/// so its stored (old) edges never take part.
pub fn check_acyclic(store: &TaskStore, id: TaskId, proposed: &[TaskId]) -> TaskResult<()> {
    debug!(%id, ?proposed, "check_acyclic: called");
    let mut visited = HashSet::new();
    for &dep in proposed {
        if let Some(found) = path_to(store, dep, id, &mut visited) {
            let mut cycle = Vec::with_capacity(found.len() + 1);
            cycle.push(id);
            cycle.extend(found);
            debug!(%id, ?cycle, "check_acyclic: cycle detected");
            return Err(TaskError::CyclicDependency { id, cycle });
        }
    }
    Ok(())
}

/// Depth-first path from `start` to `target` along dependency edges
///
/// Iterative; each frame is (node, index of the next edge to follow).
fn path_to(store: &TaskStore, start: TaskId, target: TaskId, visited: &mut HashSet<TaskId>) -> Option<Vec<TaskId>> {
    if start == target {
        return Some(vec![start]);
    }
    if !visited.insert(start) {
        return None;
    }

    let mut stack = vec![(start, 0usize)];
    while let Some(frame) = stack.last_mut() {
        let (node, cursor) = *frame;
        let next = store.get(node).ok().and_then(|task| task.dependencies.get(cursor).copied());
        match next {
            Some(dep) => {
                frame.1 += 1;
                if dep == target {
                    let mut path: Vec<TaskId> = stack.iter().map(|(id, _)| *id).collect();
                    path.push(dep);
                    return Some(path);
                }
                if visited.insert(dep) {
                    stack.push((dep, 0));
                }
            }
            None => {
                stack.pop();
            }
        }
    }
    None
}

/// Every dependency must exist and be completed
pub fn check_completion(store: &TaskStore, id: TaskId, dependencies: &[TaskId]) -> TaskResult<()> {
    debug!(%id, ?dependencies, "check_completion: called");
    let incomplete: Vec<TaskId> = dependencies
        .iter()
        .copied()
        .filter(|dep| {
            store
                .get(*dep)
                .map(|task| task.status != TaskStatus::Completed)
                .unwrap_or(true)
        })
        .collect();

    if !incomplete.is_empty() {
        debug!(%id, ?incomplete, "check_completion: dependencies not completed");
        return Err(TaskError::IncompleteDependencies { id, incomplete });
    }
    Ok(())
}

/// Validate the whole stored graph for cycles
///
/// Returns the first cycle found as a path whose last element repeats an
/// earlier one.
pub fn validate_graph(store: &TaskStore) -> Result<(), Vec<TaskId>> {
    debug!("validate_graph: called");
    let graph: HashMap<TaskId, &Task> = store.list().map(|t| (t.id, t)).collect();

    let mut visited = HashSet::new();
    for task in store.list() {
        if visited.insert(task.id)
            && let Some(cycle_path) = find_cycle(task.id, &graph, &mut visited)
        {
            debug!(?cycle_path, "validate_graph: cycle detected");
            return Err(cycle_path);
        }
    }
    Ok(())
}

/// Iterative DFS from `start`; `on_path` mirrors the frames on the stack
fn find_cycle(start: TaskId, graph: &HashMap<TaskId, &Task>, visited: &mut HashSet<TaskId>) -> Option<Vec<TaskId>> {
    let mut on_path = HashSet::from([start]);
    let mut stack = vec![(start, 0usize)];

    while let Some(frame) = stack.last_mut() {
        let (node, cursor) = *frame;
        let next = graph.get(&node).and_then(|task| task.dependencies.get(cursor).copied());
        match next {
            Some(dep) => {
                frame.1 += 1;
                if on_path.contains(&dep) {
                    let mut cycle_path: Vec<TaskId> = stack.iter().map(|(id, _)| *id).collect();
                    cycle_path.push(dep);
                    return Some(cycle_path);
                }
                if graph.contains_key(&dep) && visited.insert(dep) {
                    on_path.insert(dep);
                    stack.push((dep, 0));
                }
            }
            None => {
                on_path.remove(&node);
                stack.pop();
            }
        }
    }
    None
}

/// Order task ids so that every task comes after its dependencies
///
/// Ties follow insertion order. Fails with the cycle path if the graph is
/// not acyclic.
pub fn topological_order(store: &TaskStore) -> Result<Vec<TaskId>, Vec<TaskId>> {
    debug!(task_count = store.len(), "topological_order: called");
    validate_graph(store)?;

    let mut visited = HashSet::new();
    let mut result = Vec::with_capacity(store.len());
    for task in store.list() {
        if !visited.insert(task.id) {
            continue;
        }

        // Post-order: a task is emitted once all of its dependencies are
        let mut stack = vec![(task.id, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let deps = store.get(node).map(|t| t.dependencies.as_slice()).unwrap_or(&[]);
            match deps.get(cursor) {
                Some(&dep) => {
                    frame.1 += 1;
                    if visited.insert(dep) && store.contains(dep) {
                        stack.push((dep, 0));
                    }
                }
                None => {
                    stack.pop();
                    result.push(node);
                }
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn add(store: &mut TaskStore, deps: &[u64], status: TaskStatus) -> TaskId {
        let id = store.allocate_id();
        let input = NewTask::new(format!("task {id}"), now() + Duration::days(1), ["t"])
            .with_status(status)
            .with_dependencies(deps.iter().copied().map(TaskId::new));
        store.insert(Task::create(id, input, now()).unwrap()).unwrap();
        id
    }

    fn ids(raw: &[u64]) -> Vec<TaskId> {
        raw.iter().copied().map(TaskId::new).collect()
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut store = TaskStore::new();
        let a = add(&mut store, &[], TaskStatus::Pending);
        let err = check_references(&store, a, &[a]).unwrap_err();
        assert_eq!(err, TaskError::CyclicDependency { id: a, cycle: vec![a, a] });
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut store = TaskStore::new();
        let a = add(&mut store, &[], TaskStatus::Pending);
        let err = check_references(&store, a, &ids(&[7, 8])).unwrap_err();
        assert!(err.to_string().contains("7, 8"));
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let mut store = TaskStore::new();
        let a = add(&mut store, &[], TaskStatus::Pending);
        let b = add(&mut store, &[1], TaskStatus::Pending);
        // a -> b would close b -> a
        let err = check_acyclic(&store, a, &[b]).unwrap_err();
        assert_eq!(err, TaskError::CyclicDependency { id: a, cycle: vec![a, b, a] });
    }

    #[test]
    fn test_long_chain_cycle_detected() {
        let mut store = TaskStore::new();
        add(&mut store, &[], TaskStatus::Pending); // 1
        add(&mut store, &[1], TaskStatus::Pending); // 2 -> 1
        add(&mut store, &[2], TaskStatus::Pending); // 3 -> 2
        add(&mut store, &[3], TaskStatus::Pending); // 4 -> 3

        let err = check_acyclic(&store, TaskId::new(1), &ids(&[4])).unwrap_err();
        assert_eq!(
            err,
            TaskError::CyclicDependency {
                id: TaskId::new(1),
                cycle: ids(&[1, 4, 3, 2, 1])
            }
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut store = TaskStore::new();
        add(&mut store, &[], TaskStatus::Pending); // 1
        add(&mut store, &[1], TaskStatus::Pending); // 2
        add(&mut store, &[1], TaskStatus::Pending); // 3
        let d = add(&mut store, &[], TaskStatus::Pending); // 4
        assert!(check_acyclic(&store, d, &ids(&[2, 3])).is_ok());
    }

    #[test]
    fn test_completion_gate() {
        let mut store = TaskStore::new();
        let done = add(&mut store, &[], TaskStatus::Completed);
        let open = add(&mut store, &[], TaskStatus::InProgress);
        let t = add(&mut store, &[], TaskStatus::InProgress);

        assert!(check_completion(&store, t, &[]).is_ok());
        assert!(check_completion(&store, t, &[done]).is_ok());
        assert_eq!(
            check_completion(&store, t, &[done, open, TaskId::new(99)]),
            Err(TaskError::IncompleteDependencies {
                id: t,
                incomplete: vec![open, TaskId::new(99)]
            })
        );
    }

    #[test]
    fn test_validate_write_skips_unchanged_dependencies() {
        let mut store = TaskStore::new();
        let a = add(&mut store, &[], TaskStatus::Pending);
        let b = add(&mut store, &[1], TaskStatus::Pending);
        let previous = store.get(b).unwrap().clone();
        let mut candidate = previous.clone();
        candidate.title = "renamed".to_string();
        assert!(validate_write(&store, Some(&previous), &candidate).is_ok());

        candidate.dependencies = vec![a, TaskId::new(42)];
        assert!(validate_write(&store, Some(&previous), &candidate).is_err());
    }

    #[test]
    fn test_validate_graph_and_topological_order() {
        let mut store = TaskStore::new();
        add(&mut store, &[], TaskStatus::Pending); // 1
        add(&mut store, &[3], TaskStatus::Pending); // 2 -> 3, a forward reference
        add(&mut store, &[1], TaskStatus::Pending); // 3 -> 1
        assert!(validate_graph(&store).is_ok());
        assert_eq!(topological_order(&store).unwrap(), ids(&[1, 3, 2]));

        // Corrupt the graph directly to exercise the whole-graph check
        store.get_mut(TaskId::new(1)).unwrap().dependencies = ids(&[2]);
        let cycle = validate_graph(&store).unwrap_err();
        assert_eq!(cycle.first(), cycle.last());
        assert!(topological_order(&store).is_err());
    }

    #[test]
    fn test_new_task_skips_cycle_walk_but_update_does_not() {
        let mut store = TaskStore::new();
        add(&mut store, &[], TaskStatus::Pending); // 1
        add(&mut store, &[1], TaskStatus::Pending); // 2 -> 1

        let fresh = Task::create(
            store.peek_id(),
            NewTask::new("fresh", now() + Duration::days(1), ["t"]).with_dependencies(ids(&[2])),
            now(),
        )
        .unwrap();
        assert!(validate_write(&store, None, &fresh).is_ok());

        let previous = store.get(TaskId::new(1)).unwrap().clone();
        let mut candidate = previous.clone();
        candidate.dependencies = ids(&[2]);
        assert!(matches!(
            validate_write(&store, Some(&previous), &candidate),
            Err(TaskError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_deep_chain_does_not_exhaust_the_stack() {
        const DEPTH: u64 = 50_000;
        let mut store = TaskStore::new();
        add(&mut store, &[], TaskStatus::Pending);
        for prev in 1..DEPTH {
            add(&mut store, &[prev], TaskStatus::Pending);
        }

        // Closing the chain from its root must report the whole loop
        let err = check_acyclic(&store, TaskId::new(1), &[TaskId::new(DEPTH)]).unwrap_err();
        match err {
            TaskError::CyclicDependency { cycle, .. } => {
                assert_eq!(cycle.len() as u64, DEPTH + 1);
                assert_eq!(cycle.first(), Some(&TaskId::new(1)));
                assert_eq!(cycle.last(), Some(&TaskId::new(1)));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(validate_graph(&store).is_ok());
        let order = topological_order(&store).unwrap();
        assert_eq!(order.len() as u64, DEPTH);
        assert_eq!(order.first(), Some(&TaskId::new(1)));
        assert_eq!(order.last(), Some(&TaskId::new(DEPTH)));

        // Corrupt the root so the whole chain is one cycle
        store.get_mut(TaskId::new(1)).unwrap().dependencies = vec![TaskId::new(DEPTH)];
        let cycle = validate_graph(&store).unwrap_err();
        assert_eq!(cycle.len() as u64, DEPTH + 1);
    }
}
