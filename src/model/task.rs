use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::wire::{de_id, de_opt_id, de_opt_number, de_progress, de_string_or_null};

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    /// Human label, identical to the persisted form
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Done => "Done",
        }
    }

    /// The marker used inside `[ ]` in list output
    pub fn marker(self) -> char {
        match self {
            TaskStatus::NotStarted => ' ',
            TaskStatus::InProgress => '>',
            TaskStatus::Blocked => '-',
            TaskStatus::Done => 'x',
        }
    }

    /// Parse user input. Case-insensitive; spaces, dashes and underscores
    /// are interchangeable (`in-progress`, `In Progress`, `in_progress`).
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match normalize_word(s).as_str() {
            "notstarted" | "todo" => Some(TaskStatus::NotStarted),
            "inprogress" | "active" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match normalize_word(s).as_str() {
            "low" => Some(Priority::Low),
            "medium" | "med" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_word(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// Unit of an estimate; the suffix is what appears after the number in the
/// persisted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateUnit {
    Hours,
    Days,
}

impl EstimateUnit {
    pub const ALL: [EstimateUnit; 2] = [EstimateUnit::Hours, EstimateUnit::Days];

    pub fn suffix(self) -> char {
        match self {
            EstimateUnit::Hours => 'h',
            EstimateUnit::Days => 'd',
        }
    }

    pub fn from_suffix(c: char) -> Option<EstimateUnit> {
        EstimateUnit::ALL.into_iter().find(|u| u.suffix() == c)
    }
}

/// A work estimate, persisted as `"<amount><suffix>"` (e.g. `"8h"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub amount: f64,
    pub unit: EstimateUnit,
}

impl Estimate {
    pub fn hours(amount: f64) -> Self {
        Estimate {
            amount,
            unit: EstimateUnit::Hours,
        }
    }

    pub fn days(amount: f64) -> Self {
        Estimate {
            amount,
            unit: EstimateUnit::Days,
        }
    }

    /// Parse the persisted form (`"8h"`, `"3d"`). A bare number is read as hours.
    /// Returns `None` for blank input or an unreadable amount.
    pub fn parse(s: &str) -> Option<Estimate> {
        let s = s.trim();
        let last = s.chars().last()?;
        let (number, unit) = match EstimateUnit::from_suffix(last.to_ascii_lowercase()) {
            Some(unit) => (&s[..s.len() - last.len_utf8()], unit),
            None => (s, EstimateUnit::Hours),
        };
        let amount: f64 = number.trim().parse().ok()?;
        if !amount.is_finite() {
            return None;
        }
        Some(Estimate { amount, unit })
    }

    /// The amount without its unit suffix, as shown in an input field
    pub fn amount_text(&self) -> String {
        self.amount.to_string()
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl Serialize for Estimate {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Estimate {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        de_opt_estimate(d)?.ok_or_else(|| serde::de::Error::custom("empty estimate"))
    }
}

/// `null`, `""` and a bare number are all accepted; an unreadable string is an error.
fn de_opt_estimate<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Estimate>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }
    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(Estimate::hours(n))),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => Estimate::parse(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid estimate: {:?}", s))),
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A task record as stored in the blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub project_id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Percent complete, 0-100 by convention (not enforced here)
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: u8,
    #[serde(default, deserialize_with = "de_opt_estimate")]
    pub estimate: Option<Estimate>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub budget: Option<f64>,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for creating a task. The repository assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub progress: u8,
    pub estimate: Option<Estimate>,
    pub budget: Option<f64>,
}

impl NewTask {
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        NewTask {
            project_id: project_id.into(),
            parent_id: None,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            progress: 0,
            estimate: None,
            budget: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub(crate) fn into_task(self, id: String) -> Task {
        Task {
            id,
            project_id: self.project_id,
            parent_id: self.parent_id.filter(|p| !p.is_empty()),
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            progress: self.progress,
            estimate: self.estimate,
            budget: self.budget,
        }
    }
}

/// A partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub progress: Option<u8>,
    pub estimate: Option<Option<Estimate>>,
    pub budget: Option<Option<f64>>,
    pub parent_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Shallow merge onto `task`; fields present in the patch win.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(estimate) = self.estimate {
            task.estimate = estimate;
        }
        if let Some(budget) = self.budget {
            task.budget = budget;
        }
        if let Some(parent_id) = self.parent_id {
            task.parent_id = parent_id.filter(|p| !p.is_empty());
        }
    }
}
