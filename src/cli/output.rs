use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::ops::check::{CheckError, CheckWarning};
use crate::ops::repository::ParentOption;
use crate::ops::stats::ProjectStats;
use crate::ops::tree::{TaskNode, flatten};
use crate::util::unicode::{fit_to_width, truncate_to_width};

/// Width of the title column in `tb projects`
const PROJECT_TITLE_CELLS: usize = 30;
/// Titles in tree rows are cut at this many cells
const TASK_TITLE_CELLS: usize = 60;
const BAR_CELLS: usize = 10;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectJson<'a> {
    #[serde(flatten)]
    pub project: &'a Project,
    pub stats: ProjectStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailJson<'a> {
    #[serde(flatten)]
    pub project: ProjectJson<'a>,
    pub tasks: Vec<TaskNode>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub subtasks: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJson<'a> {
    pub id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedJson<'a> {
    pub id: &'a str,
    pub removed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentsJson<'a> {
    pub project_id: &'a str,
    pub parents: &'a [ParentOption],
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `[#####-----]` for a whole percentage
pub fn progress_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) * BAR_CELLS + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_CELLS - filled))
}

/// Budgets print as whole numbers when they are whole
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// How long ago a project changed: whole hours under a day, whole days
/// under a week, then the date.
pub fn format_last_updated(updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(updated) = updated else {
        return "Recently".to_string();
    };
    let hours = (now - updated).num_hours();
    let days = hours / 24;
    if hours < 1 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{} hours ago", hours)
    } else if days < 7 {
        format!("{} days ago", days)
    } else {
        updated.format("%b %-d, %Y").to_string()
    }
}

/// One row of `tb projects`
pub fn format_project_line(project: &Project, stats: &ProjectStats) -> String {
    format!(
        "{:>4}  {}  {} {:>3}%  {}/{} done",
        project.id,
        fit_to_width(&project.title, PROJECT_TITLE_CELLS),
        progress_bar(stats.progress_percent),
        stats.progress_percent,
        stats.completed_count,
        stats.task_count,
    )
}

/// Header block of `tb show`
pub fn format_project_detail(project: &Project, stats: &ProjectStats) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", project.title, project.id)];
    if !project.status.is_empty() {
        lines.push(format!("status: {}", project.status));
    }
    if !project.description.is_empty() {
        lines.push(project.description.clone());
    }
    lines.push(format!(
        "progress: {} {}% ({}/{} tasks done)",
        progress_bar(stats.progress_percent),
        stats.progress_percent,
        stats.completed_count,
        stats.task_count,
    ));
    lines.push(format!("budget: {}", format_amount(stats.total_budget)));
    lines.push(format!(
        "updated: {}",
        format_last_updated(project.last_updated, Utc::now())
    ));
    lines
}

/// A task as a one-line summary: `[>] 103 Build pages (High, 40%)`
pub fn format_task_line(task: &Task) -> String {
    format!(
        "[{}] {} {} ({}, {}%)",
        task.status.marker(),
        task.id,
        truncate_to_width(&task.title, TASK_TITLE_CELLS),
        task.priority,
        task.progress,
    )
}

/// Every task in the forest, one per line, with tree connectors
pub fn format_task_tree(forest: &[TaskNode]) -> Vec<String> {
    flatten(forest)
        .into_iter()
        .map(|row| format!("{}{}", row.prefix, format_task_line(&row.node.task)))
        .collect()
}

/// Detailed task view
pub fn format_task_detail(task: &Task, parent: Option<&Task>, subtasks: &[&Task]) -> Vec<String> {
    let mut lines = vec![format!("[{}] {} {}", task.status.marker(), task.id, task.title)];
    lines.push(format!("project: {}", task.project_id));
    if let Some(parent) = parent {
        lines.push(format!("parent: {} {}", parent.id, parent.title));
    } else if let Some(parent_id) = &task.parent_id {
        lines.push(format!("parent: {} (missing)", parent_id));
    }
    lines.push(format!("status: {}", task.status));
    lines.push(format!("priority: {}", task.priority));
    lines.push(format!("progress: {}%", task.progress));
    if let Some(estimate) = task.estimate {
        lines.push(format!("estimate: {}", estimate));
    }
    if let Some(budget) = task.budget {
        lines.push(format!("budget: {}", format_amount(budget)));
    }
    if !task.description.is_empty() {
        lines.push("description:".to_string());
        for line in task.description.lines() {
            lines.push(format!("  {}", line));
        }
    }
    if !subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in subtasks {
            lines.push(format!("  {}", format_task_line(sub)));
        }
    }
    lines
}

/// One row of `tb parents`, indented by level
pub fn format_parent_option(option: &ParentOption) -> String {
    format!("{}{} {}", "  ".repeat(option.level), option.id, option.title)
}

pub fn format_check_error(error: &CheckError) -> String {
    match error {
        CheckError::CountDrift {
            project_id,
            cached,
            actual,
        } => format!(
            "project {} taskCount is {} but it has {} tasks",
            project_id, cached, actual
        ),
        CheckError::UnknownProject {
            task_id,
            project_id,
        } => format!("task {} belongs to unknown project {}", task_id, project_id),
        CheckError::CrossProjectParent {
            task_id,
            parent_id,
            parent_project_id,
        } => format!(
            "task {} has parent {} from project {}",
            task_id, parent_id, parent_project_id
        ),
        CheckError::ParentCycle { task_id } => {
            format!("task {} is part of a parent cycle", task_id)
        }
        CheckError::DuplicateId {
            task_id,
            occurrences,
        } => format!("task id {} is used {} times", task_id, occurrences),
    }
}

pub fn format_check_warning(warning: &CheckWarning) -> String {
    match warning {
        CheckWarning::DanglingParent { task_id, parent_id } => {
            format!("task {} has missing parent {}", task_id, parent_id)
        }
        CheckWarning::ProgressOutOfRange { task_id, progress } => {
            format!("task {} has progress {}%", task_id, progress)
        }
        CheckWarning::CompletedDrift {
            project_id,
            cached,
            actual,
        } => format!(
            "project {} completedCount is {} but it has {} done tasks",
            project_id, cached, actual
        ),
    }
}

/// Header line and fields of a recovery entry, without its body
pub fn format_recovery_entry(entry: &RecoveryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.category,
        entry.description
    )];
    for (key, value) in &entry.fields {
        lines.push(format!("  {}: {}", key, value));
    }
    lines
}
