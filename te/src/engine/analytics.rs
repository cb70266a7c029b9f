//! Read-only reports over the store

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::TaskStatus;

use super::store::TaskStore;

pub const DEFAULT_POPULAR_TAGS_LIMIT: usize = 10;

/// Share of tasks in `completed` status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRate {
    pub total: usize,
    pub completed: usize,
    /// Percentage, two decimals; 0.0 for an empty store
    pub completion_rate: f64,
}

impl std::fmt::Display for CompletionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.completion_rate)
    }
}

/// Mean age, in whole days, of completed tasks at their last update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageCompletionTime {
    /// One decimal; 0.0 when nothing is completed
    pub average_days: f64,
    pub total_tasks_completed: usize,
}

impl std::fmt::Display for AverageCompletionTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} days", self.average_days)
    }
}

/// Usage count of a single tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Number of tasks in one status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

pub fn completion_rate(store: &TaskStore) -> CompletionRate {
    let total = store.len();
    let completed = store.list().filter(|t| t.status == TaskStatus::Completed).count();
    let completion_rate = if total == 0 {
        0.0
    } else {
        round_to(completed as f64 / total as f64 * 100.0, 2)
    };
    debug!(total, completed, completion_rate, "completion_rate: computed");
    CompletionRate {
        total,
        completed,
        completion_rate,
    }
}

pub fn average_completion_time(store: &TaskStore) -> AverageCompletionTime {
    let days: Vec<i64> = store
        .list()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| (t.updated_at - t.created_at).num_days())
        .collect();

    let average_days = if days.is_empty() {
        0.0
    } else {
        round_to(days.iter().sum::<i64>() as f64 / days.len() as f64, 1)
    };
    debug!(completed = days.len(), average_days, "average_completion_time: computed");
    AverageCompletionTime {
        average_days,
        total_tasks_completed: days.len(),
    }
}

/// Most used tags, highest count first, ties in first-seen order
pub fn popular_tags(store: &TaskStore, limit: usize) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for task in store.list() {
        for tag in &task.tags {
            match index.get(tag.as_str()) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(tag.as_str(), counts.len());
                    counts.push(TagCount {
                        tag: tag.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Task count for every status, in lifecycle order
pub fn status_breakdown(store: &TaskStore) -> Vec<StatusCount> {
    TaskStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: store.list().filter(|t| t.status == status).count(),
        })
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
