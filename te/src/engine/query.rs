//! Query pipeline: filter, sort, paginate
//!
//! Pure functions over a store snapshot. Filtering keeps insertion order,
//! sorting is stable, and a page past the end is empty rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::domain::{Priority, Task, TaskStatus};
use crate::error::{TaskError, TaskResult};

use super::store::TaskStore;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Conjunctive filter; absent predicates match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Inclusive lower bound on the due date
    #[serde(default)]
    pub due_date_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the due date
    #[serde(default)]
    pub due_date_end: Option<DateTime<Utc>>,
    /// Matches tasks carrying any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskFilter {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_due_between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.due_date_start = start;
        self.due_date_end = end;
        self
    }

    /// Reject contradictory bounds
    pub fn validate(&self) -> TaskResult<()> {
        if let (Some(start), Some(end)) = (self.due_date_start, self.due_date_end)
            && start > end
        {
            return Err(TaskError::validation("dueDateStart must not be after dueDateEnd"));
        }
        Ok(())
    }

    /// Check if a task satisfies every predicate
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| task.status != s) {
            return false;
        }
        if self.priority.is_some_and(|p| task.priority != p) {
            return false;
        }
        if self.due_date_start.is_some_and(|start| task.due_date < start) {
            return false;
        }
        if self.due_date_end.is_some_and(|end| task.due_date > end) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| task.tags.contains(tag)) {
            return false;
        }
        true
    }
}

/// Field to order results by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    DueDate,
    Priority,
    #[default]
    CreatedAt,
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dueDate" | "due_date" | "due-date" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "createdAt" | "created_at" | "created-at" => Ok(Self::CreatedAt),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

/// Sort specification; defaults to newest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl SortSpec {
    pub fn new(sort_by: SortField, sort_order: SortOrder) -> Self {
        Self { sort_by, sort_order }
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.sort_by {
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Requested page; missing values take the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Clamp to a 1-indexed page and a limit within `[1, limits.max_limit]`
    pub fn resolve(&self, limits: &PageLimits) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(limits.default_limit)
            .clamp(1, limits.max_limit.max(1));
        (page, limit)
    }
}

/// Page size bounds, usually taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// A full listing request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    #[serde(flatten)]
    pub filter: TaskFilter,
    #[serde(flatten)]
    pub sort: SortSpec,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl TaskQuery {
    pub fn new(filter: TaskFilter, sort: SortSpec, page: PageRequest) -> Self {
        Self { filter, sort, page }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of tasks matching the filter
    pub total: usize,
    /// Current page (1-indexed)
    pub page: u32,
    /// Page size used
    pub limit: u32,
    /// ceil(total / limit)
    pub pages: usize,
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

/// Filter, sort and paginate the store
pub fn list(store: &TaskStore, query: &TaskQuery, limits: &PageLimits) -> TaskResult<TaskPage> {
    debug!(?query, "list: called");
    query.filter.validate()?;

    let mut matching: Vec<&Task> = store.list().filter(|t| query.filter.matches(t)).collect();
    // slice::sort_by is stable, so ties keep insertion order
    matching.sort_by(|a, b| query.sort.compare(a, b));

    let (page, limit) = query.page.resolve(limits);
    let total = matching.len();
    let pages = total.div_ceil(limit as usize);
    let start = (page as usize - 1).saturating_mul(limit as usize);

    let tasks: Vec<Task> = matching
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();

    debug!(total, page, limit, returned = tasks.len(), "list: complete");
    Ok(TaskPage {
        tasks,
        pagination: Pagination {
            total,
            page,
            limit,
            pages,
        },
    })
}

/// Case-insensitive substring search over title and description
pub fn search(store: &TaskStore, query: &str) -> TaskResult<Vec<Task>> {
    debug!(%query, "search: called");
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(TaskError::validation("search query is required"));
    }

    Ok(store
        .list()
        .filter(|t| t.title.to_lowercase().contains(&needle) || t.description.to_lowercase().contains(&needle))
        .cloned()
        .collect())
}
