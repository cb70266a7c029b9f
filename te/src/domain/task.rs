//! Task domain type
//!
//! A Task is the only entity the engine stores. Creation and updates go
//! through explicit input types (`NewTask`, `TaskPatch`) so callers can only
//! touch whitelisted fields, and every write re-runs the field invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::TaskId;
use super::priority::Priority;
use super::status::TaskStatus;
use crate::error::{TaskError, TaskResult};

/// A unit of trackable work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, never reused
    pub id: TaskId,

    /// Short non-empty title
    pub title: String,

    /// Free text, may be empty
    pub description: String,

    /// Deadline; in the future whenever it is written
    pub due_date: DateTime<Utc>,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Priority level
    pub priority: Priority,

    /// Labels, never empty, in display order
    pub tags: Vec<String>,

    /// Tasks that must be completed before this one
    pub dependencies: Vec<TaskId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTask {
    /// Client-supplied identifier; the engine assigns one when absent
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub dependencies: Option<Vec<TaskId>>,
}

impl NewTask {
    /// Create input with the required fields set
    pub fn new<I, S>(title: impl Into<String>, due_date: DateTime<Utc>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: Some(title.into()),
            due_date: Some(due_date),
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = Some(dependencies.into_iter().collect());
        self
    }
}

/// Fields accepted when updating a task; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub dependencies: Option<Vec<TaskId>>,
}

impl TaskPatch {
    /// A patch that only moves the status
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// A patch that only replaces the dependencies
    pub fn dependencies(dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        Self {
            dependencies: Some(dependencies.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
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
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = Some(dependencies.into_iter().collect());
        self
    }

    /// Check if the patch sets no field at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Task {
    /// Build a new task from creation input
    ///
    /// Every field problem is collected into a single `Validation` error.
    pub fn create(id: TaskId, input: NewTask, now: DateTime<Utc>) -> TaskResult<Self> {
        debug!(%id, "Task::create: called");
        let mut details = Vec::new();

        let title = match input.title.as_deref().map(str::trim) {
            None => {
                details.push("title is required".to_string());
                String::new()
            }
            Some("") => {
                details.push("title must not be empty".to_string());
                String::new()
            }
            Some(title) => title.to_string(),
        };

        let due_date = match input.due_date {
            None => {
                details.push("dueDate is required".to_string());
                now
            }
            Some(due) => {
                check_due_date(due, now, &mut details);
                due
            }
        };

        let tags = match input.tags {
            None => {
                details.push("tags is required".to_string());
                Vec::new()
            }
            Some(tags) => normalize_tags(tags, &mut details),
        };

        let status = input.status.unwrap_or_default();
        let priority = input.priority.unwrap_or_default();
        if status == TaskStatus::Archived && priority == Priority::High {
            details.push("high priority tasks must be completed before archiving".to_string());
        }

        if !details.is_empty() {
            debug!(%id, ?details, "Task::create: validation failed");
            return Err(TaskError::Validation { details });
        }

        Ok(Self {
            id,
            title,
            description: input.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            due_date,
            status,
            priority,
            tags,
            dependencies: dedup_ids(input.dependencies.unwrap_or_default()),
            created_at: now,
            updated_at: now,
        })
    }

    /// Check if `status` is the legal next status for this task
    pub fn can_transition_to(&self, status: TaskStatus) -> bool {
        self.status.can_transition_to(status)
    }

    /// Check the explicit archive guard: high priority work must be completed first
    pub fn can_be_archived(&self) -> bool {
        self.priority != Priority::High || self.status == TaskStatus::Completed
    }

    /// Check if this task lists `other` as a dependency
    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }

    /// Merge a patch into this task
    ///
    /// The merge is all-or-nothing: on error the task is left untouched.
    /// `updated_at` is refreshed on every successful call, even for an empty
    /// patch.
    pub fn apply_update(&mut self, patch: &TaskPatch, now: DateTime<Utc>) -> TaskResult<()> {
        debug!(id = %self.id, ?patch, "Task::apply_update: called");

        if let Some(next) = patch.status
            && !self.can_transition_to(next)
        {
            debug!(id = %self.id, from = %self.status, to = %next, "Task::apply_update: illegal transition");
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let mut details = Vec::new();
        let mut candidate = self.clone();

        if let Some(title) = &patch.title {
            let title = title.trim();
            if title.is_empty() {
                details.push("title must not be empty".to_string());
            }
            candidate.title = title.to_string();
        }
        if let Some(description) = &patch.description {
            candidate.description = description.trim().to_string();
        }
        if let Some(due) = patch.due_date {
            check_due_date(due, now, &mut details);
            candidate.due_date = due;
        }
        if let Some(priority) = patch.priority {
            candidate.priority = priority;
        }
        if let Some(tags) = &patch.tags {
            candidate.tags = normalize_tags(tags.clone(), &mut details);
        }
        if let Some(dependencies) = &patch.dependencies {
            candidate.dependencies = dedup_ids(dependencies.clone());
        }
        if let Some(status) = patch.status {
            if status == TaskStatus::Archived && candidate.priority == Priority::High && !self.can_be_archived() {
                details.push("high priority tasks must be completed before archiving".to_string());
            }
            candidate.status = status;
        }

        if !details.is_empty() {
            debug!(id = %self.id, ?details, "Task::apply_update: validation failed");
            return Err(TaskError::Validation { details });
        }

        candidate.updated_at = now;
        *self = candidate;
        Ok(())
    }
}

fn check_due_date(due: DateTime<Utc>, now: DateTime<Utc>, details: &mut Vec<String>) {
    if due <= now {
        details.push("dueDate must be in the future".to_string());
    }
}

/// Trim labels, drop repeats, keep first-seen order
fn normalize_tags(tags: Vec<String>, details: &mut Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    let mut blank = false;
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            blank = true;
        } else if !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    if blank {
        details.push("tags must not contain blank labels".to_string());
    }
    if normalized.is_empty() && !blank {
        details.push("tags must contain at least one tag".to_string());
    }
    normalized
}

fn dedup_ids(ids: Vec<TaskId>) -> Vec<TaskId> {
    let mut out: Vec<TaskId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
