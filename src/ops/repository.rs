use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::io::recovery::{RecoveryCategory, RecoveryEntry};
use crate::io::store_io::{self, LoadSource, StoreBackend, StoreError};
use crate::model::project::Project;
use crate::model::store::StoreData;
use crate::model::task::{NewTask, Task, TaskPatch};

/// Only tasks at these levels (roots and their direct children) can be chosen
/// as a parent, which caps the editable tree at three levels.
pub const PARENT_LEVELS: usize = 2;

/// A task that may be picked as a parent, with its depth in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentOption {
    pub id: String,
    pub title: String,
    pub level: usize,
}

/// The only way to read or change the board.
///
/// Owns the in-memory store and the backend it persists to. Every mutation
/// is applied in memory and then the whole store is written once; lookups
/// of unknown ids yield `None`/`false` rather than errors. Errors only come
/// from persistence.
pub struct Repository {
    data: StoreData,
    backend: Box<dyn StoreBackend>,
    unsaved: bool,
    last_issued_id: i64,
}

impl Repository {
    /// Load (or seed, or migrate) the store from `backend`.
    pub fn open(mut backend: Box<dyn StoreBackend>) -> Result<(Self, LoadSource), StoreError> {
        let (data, source) = store_io::load_store(backend.as_mut())?;
        Ok((Self::with_data(data, backend), source))
    }

    /// Wrap already-loaded data. Nothing is written until the first mutation.
    pub fn with_data(data: StoreData, backend: Box<dyn StoreBackend>) -> Self {
        Repository {
            data,
            backend,
            unsaved: false,
            last_issued_id: 0,
        }
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn projects(&self) -> &[Project] {
        &self.data.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.data.projects.iter().find(|p| p.id == id)
    }

    /// All tasks of a project, in storage order
    pub fn tasks(&self, project_id: &str) -> Vec<&Task> {
        self.data
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .collect()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.data.tasks.iter().find(|t| t.id == id)
    }

    /// Direct children only, in storage order
    pub fn child_tasks(&self, parent_id: &str) -> Vec<&Task> {
        self.data
            .tasks
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    pub fn root_tasks(&self, project_id: &str) -> Vec<&Task> {
        self.data
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.is_root())
            .collect()
    }

    /// Tasks that can be offered as a parent, in pre-order: each root in
    /// storage order followed by its children. `exclude` (the task being
    /// edited) is left out together with its whole subtree, since choosing
    /// any of them would create a cycle.
    pub fn available_parents(&self, project_id: &str, exclude: Option<&str>) -> Vec<ParentOption> {
        let mut result = Vec::new();
        let mut stack: Vec<(&Task, usize)> = self
            .root_tasks(project_id)
            .into_iter()
            .rev()
            .map(|t| (t, 0))
            .collect();

        while let Some((task, level)) = stack.pop() {
            if exclude == Some(task.id.as_str()) {
                continue;
            }
            result.push(ParentOption {
                id: task.id.clone(),
                title: task.title.clone(),
                level,
            });
            if level + 1 < PARENT_LEVELS {
                for child in self.child_tasks(&task.id).into_iter().rev() {
                    if child.project_id == project_id {
                        stack.push((child, level + 1));
                    }
                }
            }
        }
        result
    }

    /// Ids of `id` and all its descendants, children before parents.
    /// Empty if `id` is unknown.
    pub fn subtree_ids(&self, id: &str) -> Vec<String> {
        if self.task(id).is_none() {
            return Vec::new();
        }
        let mut order = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        // (id, children already pushed)
        let mut stack: Vec<(&str, bool)> = vec![(id, false)];
        seen.insert(id);

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current.to_string());
                continue;
            }
            stack.push((current, true));
            for child in self.child_tasks(current).into_iter().rev() {
                if seen.insert(child.id.as_str()) {
                    stack.push((child.id.as_str(), false));
                }
            }
        }
        order
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new task with a fresh id and bump its project's counter.
    pub fn create_task(&mut self, input: NewTask) -> Result<Task, StoreError> {
        let id = self.next_task_id();
        let task = input.into_task(id);
        let project_id = task.project_id.clone();
        self.data.tasks.push(task.clone());

        if let Some(project) = self.project_mut(&project_id) {
            project.task_count += 1;
        }
        self.touch_project(&project_id);
        self.persist()?;
        Ok(task)
    }

    /// Merge `patch` onto the task. `None` if the id is unknown.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>, StoreError> {
        let Some(task) = self.data.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        patch.apply(task);
        let updated = task.clone();

        self.touch_project(&updated.project_id);
        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete a task and its descendants. `false` if the id is unknown, in
    /// which case nothing is changed or written.
    pub fn delete_task(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.delete_task_counted(id)?.is_some())
    }

    /// Like [`delete_task`](Self::delete_task), reporting how many records
    /// were removed.
    pub fn delete_task_counted(&mut self, id: &str) -> Result<Option<usize>, StoreError> {
        let Some(project_id) = self.task(id).map(|t| t.project_id.clone()) else {
            return Ok(None);
        };

        let mut removed = Vec::new();
        for doomed in self.subtree_ids(id) {
            let Some(pos) = self.data.tasks.iter().position(|t| t.id == doomed) else {
                continue;
            };
            let task = self.data.tasks.remove(pos);
            if let Some(project) = self.project_mut(&task.project_id) {
                project.task_count = project.task_count.saturating_sub(1);
            }
            removed.push(task);
        }

        let mut touched: Vec<String> = Vec::new();
        for task in &removed {
            if !touched.contains(&task.project_id) {
                touched.push(task.project_id.clone());
            }
        }
        for touched_id in &touched {
            self.touch_project(touched_id);
        }
        if let Ok(body) = serde_json::to_string_pretty(&removed) {
            self.backend.log(
                RecoveryEntry::new(RecoveryCategory::Delete, format!("task {} deleted", id))
                    .field("Project", project_id.clone())
                    .field("Removed", removed.len().to_string())
                    .body(body),
            );
        }
        self.persist()?;
        Ok(Some(removed.len()))
    }

    /// Recompute every project's cached counters from the task list and
    /// persist if anything changed. Returns the number of projects fixed.
    pub fn repair_counts(&mut self) -> Result<usize, StoreError> {
        let fixed = crate::ops::check::repair_counts(&mut self.data);
        if fixed > 0 {
            self.persist()?;
        }
        Ok(fixed)
    }

    /// Write the store if a previous save failed. Call before shutdown.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.unsaved {
            self.persist()?;
        }
        Ok(())
    }

    /// True when in-memory changes have not reached the backend
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.data.projects.iter_mut().find(|p| p.id == id)
    }

    /// Stamp `last_updated` and refresh the completed counter
    fn touch_project(&mut self, project_id: &str) {
        let done = self.data.count_done(project_id);
        if let Some(project) = self.project_mut(project_id) {
            project.last_updated = Some(Utc::now());
            project.completed_count = done;
        }
    }

    /// Millisecond timestamp, moved forward past anything already issued
    /// or stored so two creates in the same millisecond never collide.
    fn next_task_id(&mut self) -> String {
        let mut candidate = Utc::now()
            .timestamp_millis()
            .max(self.last_issued_id + 1);
        while self.task(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        self.last_issued_id = candidate;
        candidate.to_string()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.unsaved = true;
        let blob = store_io::encode(&self.data)?;
        self.backend.save(&blob)?;
        self.unsaved = false;
        Ok(())
    }
}
