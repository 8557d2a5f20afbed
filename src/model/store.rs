use serde::{Deserialize, Serialize};

use super::project::Project;
use super::task::{Task, TaskStatus};

/// Everything that is persisted: the whole board in one blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl StoreData {
    /// Count the tasks belonging to a project by scanning the task list
    pub fn count_tasks(&self, project_id: &str) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .count()
    }

    /// Count the `Done` tasks belonging to a project
    pub fn count_done(&self, project_id: &str) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.status == TaskStatus::Done)
            .count()
    }
}
