use serde::Serialize;

use crate::model::task::{Task, TaskStatus};

/// Aggregate figures shown on project cards and the detail header
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub task_count: usize,
    pub completed_count: usize,
    /// Share of `Done` tasks, rounded to a whole percent
    pub progress_percent: u8,
    /// Sum of task budgets; tasks without one count as 0
    pub total_budget: f64,
}

/// Compute stats from a project's tasks.
pub fn project_stats<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> ProjectStats {
    let mut stats = ProjectStats::default();
    for task in tasks {
        stats.task_count += 1;
        if task.status == TaskStatus::Done {
            stats.completed_count += 1;
        }
        stats.total_budget += task.budget.unwrap_or(0.0);
    }
    stats.progress_percent = percent(stats.completed_count, stats.task_count);
    stats
}

/// `part / whole` as a rounded percentage; 0 when `whole` is 0
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round().min(100.0) as u8
}
