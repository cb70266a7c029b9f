//! Shared access with the actor pattern
//!
//! TaskManager owns the TaskEngine and processes messages via channels,
//! giving many async callers serialized access to one engine.

mod manager;
mod messages;

pub use manager::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_EVENT_CAPACITY, TaskEvent, TaskManager};
pub use messages::TaskCommand;
