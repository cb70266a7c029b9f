//! Task identifiers
//!
//! Identifiers are engine-assigned monotonic integers. Dependencies use the
//! same type, so a reference can never disagree with the id it points at.

use serde::{Deserialize, Serialize};

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw identifier
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier that follows this one, `None` at `u64::MAX`
    pub(crate) const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::str::FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map(Self)
            .map_err(|_| format!("Invalid task id: {}", s))
    }
}

/// Render a list of ids as `1, 2, 3`
pub(crate) fn join_ids(ids: &[TaskId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

/// Render a dependency path as `1 -> 2 -> 1`
pub(crate) fn format_path(ids: &[TaskId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" -> ")
}
