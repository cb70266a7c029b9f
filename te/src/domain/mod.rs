//! Domain types for the task engine
//!
//! Core domain types: Task, its status graph, priority and identifier.
//! Creation and update inputs are whitelisted (`NewTask`, `TaskPatch`).

mod id;
mod priority;
mod status;
mod task;

pub use id::TaskId;
pub use priority::Priority;
pub use status::TaskStatus;
pub use task::{NewTask, Task, TaskPatch};

pub(crate) use id::{format_path, join_ids};
