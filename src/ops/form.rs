//! Input policy for creating and editing tasks.
//!
//! The repository stores whatever it is given; this is where user input is
//! limited, linked and validated before it gets there.

use serde::Serialize;

use crate::model::config::LimitsConfig;
use crate::model::task::{Estimate, EstimateUnit, NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::ops::repository::ParentOption;

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        FieldError {
            field,
            message: message.to_string(),
        }
    }
}

/// Every field that failed validation, in form order
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task: {}", summarize(.errors))]
pub struct FormError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field values as entered. Setters apply the input limits and the
/// status/progress linkage; `validate` decides whether the form can be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub parent_id: Option<String>,
    pub progress: u8,
    /// Amount only; the unit suffix is added on save
    pub estimate: String,
    pub estimate_unit: EstimateUnit,
    pub budget: String,
    limits: LimitsConfig,
    /// Parent when the form was opened. Keeping it needs no re-check.
    original_parent: Option<String>,
}

impl TaskForm {
    /// An empty form for a new task
    pub fn new(limits: LimitsConfig) -> Self {
        TaskForm {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            parent_id: None,
            progress: 0,
            estimate: String::new(),
            estimate_unit: EstimateUnit::Hours,
            budget: String::new(),
            limits,
            original_parent: None,
        }
    }

    /// A form pre-filled from an existing task
    pub fn from_task(task: &Task, limits: LimitsConfig) -> Self {
        TaskForm {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            parent_id: task.parent_id.clone(),
            progress: task.progress,
            estimate: task.estimate.map(|e| e.amount_text()).unwrap_or_default(),
            estimate_unit: task.estimate.map_or(EstimateUnit::Hours, |e| e.unit),
            budget: task.budget.map(|b| b.to_string()).unwrap_or_default(),
            limits,
            original_parent: task.parent_id.clone(),
        }
    }

    pub fn set_title(&mut self, value: &str) {
        self.title = value.chars().take(self.limits.title_max).collect();
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = value.chars().take(self.limits.description_max).collect();
    }

    /// Digits only, at most `estimate_digits` of them. A trailing unit
    /// suffix (`h`, `d`) selects the unit; without one the unit is kept.
    pub fn set_estimate(&mut self, value: &str) {
        if let Some(last) = value.trim().chars().last()
            && let Some(unit) = EstimateUnit::from_suffix(last.to_ascii_lowercase())
        {
            self.estimate_unit = unit;
        }
        self.estimate = digits(value, self.limits.estimate_digits);
    }

    pub fn set_budget(&mut self, value: &str) {
        self.budget = digits(value, self.limits.budget_digits);
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn set_parent(&mut self, parent_id: Option<String>) {
        self.parent_id = parent_id.filter(|p| !p.is_empty());
    }

    /// `Done` implies 100% and `Not Started` implies 0%.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        match status {
            TaskStatus::Done => self.progress = 100,
            TaskStatus::NotStarted => self.progress = 0,
            TaskStatus::InProgress | TaskStatus::Blocked => {}
        }
    }

    /// 100% implies `Done`, 0% implies `Not Started`; anything in between
    /// moves a `Done` or `Not Started` task to `In Progress`.
    pub fn set_progress(&mut self, progress: u8) {
        let progress = progress.min(100);
        self.progress = progress;
        self.status = match (progress, self.status) {
            (100, _) => TaskStatus::Done,
            (0, _) => TaskStatus::NotStarted,
            (_, TaskStatus::Done | TaskStatus::NotStarted) => TaskStatus::InProgress,
            (_, status) => status,
        };
    }

    /// Check every field. `parents` is the list the parent may be chosen
    /// from (see `Repository::available_parents`).
    pub fn validate(&self, parents: &[ParentOption]) -> Result<ValidTask, FormError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Task title is required"));
        }

        let amount = strip_unit(&self.estimate, self.estimate_unit);
        let estimate = positive_amount(amount, "estimate", "Estimate")
            .map_err(|e| errors.push(e))
            .ok();
        let budget = positive_amount(&self.budget, "budget", "Budget")
            .map_err(|e| errors.push(e))
            .ok();

        if let Some(parent_id) = &self.parent_id
            && self.parent_id != self.original_parent
            && !parents.iter().any(|p| &p.id == parent_id)
        {
            errors.push(FieldError::new(
                "parent",
                "Parent must be a top-level task or one of its direct subtasks in this project",
            ));
        }

        match (estimate, budget) {
            (Some(estimate), Some(budget)) if errors.is_empty() => Ok(ValidTask {
                title: self.title.trim().to_string(),
                description: self.description.clone(),
                status: self.status,
                priority: self.priority,
                parent_id: self.parent_id.clone(),
                progress: self.progress,
                estimate: Estimate {
                    amount: estimate,
                    unit: self.estimate_unit,
                },
                budget,
            }),
            _ => Err(FormError { errors }),
        }
    }
}

/// A form that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub parent_id: Option<String>,
    pub progress: u8,
    pub estimate: Estimate,
    pub budget: f64,
}

impl ValidTask {
    pub fn into_new_task(self, project_id: &str) -> NewTask {
        NewTask {
            project_id: project_id.to_string(),
            parent_id: self.parent_id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            progress: self.progress,
            estimate: Some(self.estimate),
            budget: Some(self.budget),
        }
    }

    /// Every form field, as a save from the edit form writes them all
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title),
            description: Some(self.description),
            status: Some(self.status),
            priority: Some(self.priority),
            progress: Some(self.progress),
            estimate: Some(Some(self.estimate)),
            budget: Some(Some(self.budget)),
            parent_id: Some(self.parent_id),
        }
    }
}

fn digits(value: &str, max: usize) -> String {
    value.chars().filter(char::is_ascii_digit).take(max).collect()
}

fn strip_unit(value: &str, unit: EstimateUnit) -> &str {
    let value = value.trim();
    value.strip_suffix(unit.suffix()).unwrap_or(value)
}

fn positive_amount(value: &str, field: &'static str, label: &str) -> Result<f64, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field, &format!("{} is required", label)));
    }
    match value.parse::<f64>() {
        Ok(n) if n > 0.0 && n.is_finite() => Ok(n),
        Ok(_) => Err(FieldError::new(
            field,
            &format!("{} must be greater than 0", label),
        )),
        Err(_) => Err(FieldError::new(field, &format!("{} must be a number", label))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parents() -> Vec<ParentOption> {
        vec![
            ParentOption {
                id: "1".into(),
                title: "Root".into(),
                level: 0,
            },
            ParentOption {
                id: "2".into(),
                title: "Child".into(),
                level: 1,
            },
        ]
    }

    fn filled() -> TaskForm {
        let mut form = TaskForm::new(LimitsConfig::default());
        form.set_title("Write release notes");
        form.set_estimate("6");
        form.set_budget("250");
        form
    }

    fn fields(err: FormError) -> Vec<&'static str> {
        err.errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn valid_form_becomes_new_task() {
        let mut form = filled();
        form.set_parent(Some("2".into()));
        let task = form.validate(&parents()).unwrap().into_new_task("P1");
        assert_eq!(task.title, "Write release notes");
        assert_eq!(task.parent_id.as_deref(), Some("2"));
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.estimate, Some(Estimate::hours(6.0)));
        assert_eq!(task.budget, Some(250.0));
    }

    #[test]
    fn empty_form_reports_every_field() {
        let form = TaskForm::new(LimitsConfig::default());
        let err = form.validate(&parents()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid task: Task title is required; Estimate is required; Budget is required"
        );
        assert_eq!(fields(err), vec!["title", "estimate", "budget"]);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let mut form = filled();
        form.set_estimate("0");
        form.set_budget("000");
        let err = form.validate(&parents()).unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                FieldError::new("estimate", "Estimate must be greater than 0"),
                FieldError::new("budget", "Budget must be greater than 0"),
            ]
        );
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut form = filled();
        form.set_title("   ");
        assert_eq!(fields(form.validate(&parents()).unwrap_err()), vec!["title"]);
    }

    #[test]
    fn parent_must_be_offered() {
        let mut form = filled();
        form.set_parent(Some("3".into()));
        assert_eq!(fields(form.validate(&parents()).unwrap_err()), vec!["parent"]);
    }

    #[test]
    fn input_limits() {
        let mut form = TaskForm::new(LimitsConfig::default());
        form.set_title(&"x".repeat(150));
        assert_eq!(form.title.chars().count(), 100);
        form.set_description(&"é".repeat(600));
        assert_eq!(form.description.chars().count(), 500);
        form.set_estimate("12h");
        assert_eq!(form.estimate, "12");
        form.set_estimate("1234567890");
        assert_eq!(form.estimate, "12345678");
        form.set_budget("$1,500.00");
        assert_eq!(form.budget, "150000");
    }

    #[test]
    fn status_drives_progress() {
        let mut form = filled();
        form.set_progress(40);
        form.set_status(TaskStatus::Done);
        assert_eq!(form.progress, 100);
        form.set_status(TaskStatus::NotStarted);
        assert_eq!(form.progress, 0);
        form.set_progress(40);
        form.set_status(TaskStatus::Blocked);
        assert_eq!(form.progress, 40);
    }

    #[test]
    fn progress_drives_status() {
        let mut form = filled();
        form.set_progress(100);
        assert_eq!(form.status, TaskStatus::Done);
        form.set_progress(30);
        assert_eq!(form.status, TaskStatus::InProgress);
        form.set_status(TaskStatus::Blocked);
        form.set_progress(60);
        assert_eq!(form.status, TaskStatus::Blocked);
        form.set_progress(0);
        assert_eq!(form.status, TaskStatus::NotStarted);
        form.set_progress(250);
        assert_eq!(form.progress, 100);
    }

    #[test]
    fn estimate_suffix_picks_the_unit() {
        let mut form = filled();
        form.set_estimate("3d");
        assert_eq!(form.estimate, "3");
        assert_eq!(form.estimate_unit, EstimateUnit::Days);
        form.set_estimate("5");
        assert_eq!(form.estimate_unit, EstimateUnit::Days);
        let task = form.validate(&parents()).unwrap().into_new_task("P1");
        assert_eq!(task.estimate, Some(Estimate::days(5.0)));
    }

    #[test]
    fn day_estimate_survives_an_edit() {
        let mut task = sample_task();
        task.estimate = Some(Estimate::days(3.0));
        let mut form = TaskForm::from_task(&task, LimitsConfig::default());
        form.set_title("Renamed");
        let valid = form.validate(&parents()).unwrap();
        assert_eq!(valid.estimate, Estimate::days(3.0));
    }

    #[test]
    fn unchanged_parent_is_not_rechecked() {
        let mut task = sample_task();
        task.parent_id = Some("9".into());
        let mut form = TaskForm::from_task(&task, LimitsConfig::default());
        form.set_title("Renamed");
        assert!(form.validate(&parents()).is_ok());

        form.set_parent(Some("8".into()));
        assert_eq!(fields(form.validate(&parents()).unwrap_err()), vec!["parent"]);

        form.set_parent(Some("9".into()));
        assert!(form.validate(&parents()).is_ok());
    }

    fn sample_task() -> Task {
        Task {
            id: "7".into(),
            project_id: "P1".into(),
            parent_id: Some("1".into()),
            title: "Old".into(),
            description: "desc".into(),
            status: TaskStatus::InProgress,
            priority: Priority::High,
            progress: 50,
            estimate: Some(Estimate::hours(2.5)),
            budget: Some(1200.0),
        }
    }

    #[test]
    fn edit_round_trip_writes_all_fields() {
        let task = Task {
            id: "7".into(),
            project_id: "P1".into(),
            parent_id: Some("1".into()),
            title: "Old".into(),
            description: "desc".into(),
            status: TaskStatus::InProgress,
            priority: Priority::High,
            progress: 50,
            estimate: Some(Estimate::hours(2.5)),
            budget: Some(1200.0),
        };
        let mut form = TaskForm::from_task(&task, LimitsConfig::default());
        assert_eq!(form.estimate, "2.5");
        assert_eq!(form.budget, "1200");
        form.set_title("New");

        let mut updated = task.clone();
        form.validate(&parents()).unwrap().into_patch().apply(&mut updated);
        assert_eq!(
            updated,
            Task {
                title: "New".into(),
                ..task
            }
        );
    }
}
