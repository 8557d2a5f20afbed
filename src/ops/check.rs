use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::store::StoreData;
use crate::model::task::Task;

/// Structured result from `tb check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// Something that breaks a store invariant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckError {
    /// Cached taskCount differs from the number of tasks in the project
    CountDrift {
        project_id: String,
        cached: usize,
        actual: usize,
    },
    /// A task belongs to a project that does not exist
    UnknownProject { task_id: String, project_id: String },
    /// A task's parent lives in a different project
    CrossProjectParent {
        task_id: String,
        parent_id: String,
        parent_project_id: String,
    },
    /// Following parent links from this task leads back to it
    ParentCycle { task_id: String },
    /// Two tasks share an id
    DuplicateId { task_id: String, occurrences: usize },
}

/// Something odd but tolerated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckWarning {
    /// The parent id does not resolve; the task is shown as a root
    DanglingParent { task_id: String, parent_id: String },
    /// Progress outside 0-100
    ProgressOutOfRange { task_id: String, progress: u8 },
    /// Cached completedCount differs from the number of Done tasks
    CompletedDrift {
        project_id: String,
        cached: usize,
        actual: usize,
    },
}

/// Validate the store. Read-only.
pub fn check_store(data: &StoreData) -> CheckResult {
    let mut result = CheckResult::default();
    let by_id: HashMap<&str, &Task> = data.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let project_ids: HashSet<&str> = data.projects.iter().map(|p| p.id.as_str()).collect();

    for project in &data.projects {
        let actual = data.count_tasks(&project.id);
        if project.task_count != actual {
            result.errors.push(CheckError::CountDrift {
                project_id: project.id.clone(),
                cached: project.task_count,
                actual,
            });
        }
        let done = data.count_done(&project.id);
        if project.completed_count != done {
            result.warnings.push(CheckWarning::CompletedDrift {
                project_id: project.id.clone(),
                cached: project.completed_count,
                actual: done,
            });
        }
    }

    // First-seen order, so duplicates are reported in storage order
    let mut occurrences: IndexMap<&str, usize> = IndexMap::new();
    for task in &data.tasks {
        *occurrences.entry(task.id.as_str()).or_default() += 1;
    }
    for (task_id, n) in occurrences {
        if n > 1 {
            result.errors.push(CheckError::DuplicateId {
                task_id: task_id.to_string(),
                occurrences: n,
            });
        }
    }

    for task in &data.tasks {
        if !project_ids.contains(task.project_id.as_str()) {
            result.errors.push(CheckError::UnknownProject {
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
            });
        }
        if task.progress > 100 {
            result.warnings.push(CheckWarning::ProgressOutOfRange {
                task_id: task.id.clone(),
                progress: task.progress,
            });
        }
        let Some(parent_id) = task.parent_id.as_deref() else {
            continue;
        };
        match by_id.get(parent_id) {
            None => result.warnings.push(CheckWarning::DanglingParent {
                task_id: task.id.clone(),
                parent_id: parent_id.to_string(),
            }),
            Some(parent) if parent.project_id != task.project_id => {
                result.errors.push(CheckError::CrossProjectParent {
                    task_id: task.id.clone(),
                    parent_id: parent_id.to_string(),
                    parent_project_id: parent.project_id.clone(),
                })
            }
            Some(_) => {}
        }
        if on_parent_cycle(task, &by_id) {
            result.errors.push(CheckError::ParentCycle {
                task_id: task.id.clone(),
            });
        }
    }

    result.valid = result.errors.is_empty();
    result
}

/// Walk parent links from `task`; true if they come back to it.
fn on_parent_cycle(task: &Task, by_id: &HashMap<&str, &Task>) -> bool {
    let mut seen = HashSet::new();
    let mut current = task.parent_id.as_deref();
    while let Some(id) = current {
        if id == task.id {
            return true;
        }
        if !seen.insert(id) {
            // A cycle further up that does not include this task
            return false;
        }
        current = by_id.get(id).and_then(|t| t.parent_id.as_deref());
    }
    false
}

/// Recompute `task_count` and `completed_count` for every project.
/// Returns the number of projects whose counters changed.
pub fn repair_counts(data: &mut StoreData) -> usize {
    let mut totals: HashMap<String, (usize, usize)> = HashMap::new();
    for project in &data.projects {
        totals.insert(
            project.id.clone(),
            (data.count_tasks(&project.id), data.count_done(&project.id)),
        );
    }
    let mut fixed = 0;
    for project in &mut data.projects {
        let (count, done) = totals[&project.id];
        if project.task_count != count || project.completed_count != done {
            project.task_count = count;
            project.completed_count = done;
            fixed += 1;
        }
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store_io::seed_data;
    use crate::model::task::TaskStatus;

    #[test]
    fn seed_is_valid() {
        let result = check_store(&seed_data().unwrap());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn detects_count_drift() {
        let mut data = seed_data().unwrap();
        data.projects[0].task_count += 2;
        let result = check_store(&data);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::CountDrift {
                project_id: "1".into(),
                cached: 9,
                actual: 7,
            }]
        );
    }

    #[test]
    fn detects_parent_problems() {
        let mut data = seed_data().unwrap();
        // 201 (project 2) now points at 101 (project 1)
        data.tasks.iter_mut().find(|t| t.id == "201").unwrap().parent_id = Some("101".into());
        // 204 points at nothing
        data.tasks.iter_mut().find(|t| t.id == "204").unwrap().parent_id = Some("999".into());
        let result = check_store(&data);
        assert!(result.errors.contains(&CheckError::CrossProjectParent {
            task_id: "201".into(),
            parent_id: "101".into(),
            parent_project_id: "1".into(),
        }));
        assert!(result.warnings.contains(&CheckWarning::DanglingParent {
            task_id: "204".into(),
            parent_id: "999".into(),
        }));
    }

    #[test]
    fn detects_cycles_for_each_member() {
        let mut data = seed_data().unwrap();
        // 101 -> 102 -> 101
        data.tasks.iter_mut().find(|t| t.id == "101").unwrap().parent_id = Some("102".into());
        let cycles = check_store(&data)
            .errors
            .iter()
            .filter(|e| matches!(e, CheckError::ParentCycle { .. }))
            .count();
        assert_eq!(cycles, 2);
    }

    #[test]
    fn detects_duplicates_and_unknown_projects() {
        let mut data = seed_data().unwrap();
        let mut copy = data.tasks[0].clone();
        copy.project_id = "77".into();
        data.tasks.push(copy);
        let result = check_store(&data);
        assert!(result.errors.contains(&CheckError::DuplicateId {
            task_id: "101".into(),
            occurrences: 2,
        }));
        assert!(result.errors.contains(&CheckError::UnknownProject {
            task_id: "101".into(),
            project_id: "77".into(),
        }));
    }

    #[test]
    fn repair_fixes_both_counters() {
        let mut data = seed_data().unwrap();
        data.projects[1].task_count = 0;
        data.tasks
            .iter_mut()
            .find(|t| t.id == "202")
            .unwrap()
            .status = TaskStatus::Done;
        assert_eq!(repair_counts(&mut data), 1);
        assert_eq!(data.projects[1].task_count, 5);
        assert_eq!(data.projects[1].completed_count, 2);
        assert_eq!(repair_counts(&mut data), 0);
        assert!(check_store(&data).valid);
    }
}
