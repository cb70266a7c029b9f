//! taskengine - task lifecycle, dependency and analytics engine
//!
//! An in-memory engine for task records with a linear status lifecycle,
//! dependency gating and derived analytics.
//!
//! # Core Concepts
//!
//! - **Linear Lifecycle**: `pending -> in_progress -> completed -> archived`, no skipping, no going back
//! - **Gated Completion**: a task completes only after every dependency has completed
//! - **Acyclic Graph**: writes that would close a dependency cycle are rejected
//! - **Batch Policy**: creates and deletes are all-or-nothing, updates commit item by item
//!
//! # Modules
//!
//! - [`domain`] - Task entity, status graph, priority and identifiers
//! - [`engine`] - Store, query pipeline, dependency validator, batches and analytics
//! - [`state`] - Actor handle giving async callers serialized access
//! - [`api`] - JSON request/response adapter
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod state;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use domain::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
pub use engine::{
    AverageCompletionTime, BatchReport, BatchUpdateItem, CompletionRate, EngineSettings, PageRequest, Pagination,
    SortField, SortOrder, SortSpec, StatusCount, TagCount, TaskEngine, TaskFilter, TaskPage, TaskQuery, TaskStore,
};
pub use error::{ItemFailure, TaskError, TaskResult};
pub use state::{TaskEvent, TaskManager};
