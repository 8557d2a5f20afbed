use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire::{de_id, de_opt_timestamp, de_string_or_null};

/// A project with its cached task statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub description: String,
    /// Number of tasks in this project. Maintained by the repository on
    /// create/delete, never recomputed on read.
    #[serde(default)]
    pub task_count: usize,
    /// Number of `Done` tasks, refreshed whenever one of the project's tasks changes
    #[serde(default)]
    pub completed_count: usize,
    /// Free-form label carried over from the seed (e.g. "Active", "Planning")
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub status: String,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}
