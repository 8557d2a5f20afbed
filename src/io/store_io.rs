use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::store::StoreData;

/// Bundled sample board used when no blob has been persisted yet
const SEED_JSON: &str = include_str!("../seed/sample-data.json");

/// Task fields added after the first release
const MIGRATED_TASK_FIELDS: [&str; 3] = ["progress", "estimate", "budget"];

/// The value an older blob gets for a missing task field
fn migrated_default(field: &str) -> Value {
    match field {
        "progress" => Value::from(0),
        _ => Value::Null,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read store {location}: {source}")]
    Read {
        location: String,
        source: std::io::Error,
    },
    #[error("could not write store {location}: {source}")]
    Write {
        location: String,
        source: std::io::Error,
    },
    #[error("store {location} is not valid: {source}")]
    Parse {
        location: String,
        source: serde_json::Error,
    },
    #[error("could not encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the serialized blob lives. The blob is always read and written whole.
pub trait StoreBackend {
    /// The persisted blob, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the persisted blob.
    fn save(&mut self, blob: &str) -> Result<(), StoreError>;

    /// Human-readable location, used in messages.
    fn location(&self) -> String;

    /// Record something that could not be kept in the blob itself.
    fn log(&self, _entry: RecoveryEntry) {}
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// A JSON file `<key>.json` inside the board directory
pub struct FileBackend {
    board_dir: PathBuf,
    path: PathBuf,
}

impl FileBackend {
    pub fn new(board_dir: &Path, key: &str) -> Self {
        FileBackend {
            board_dir: board_dir.to_path_buf(),
            path: board_dir.join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for FileBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|source| StoreError::Read {
                location: self.location(),
                source,
            })
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        if let Err(source) = recovery::atomic_write(&self.path, blob.as_bytes()) {
            self.log(
                RecoveryEntry::new(RecoveryCategory::Write, "store write failed")
                    .field("Target", self.location())
                    .field("Error", source.to_string())
                    .body(blob),
            );
            return Err(StoreError::Write {
                location: self.location(),
                source,
            });
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn log(&self, entry: RecoveryEntry) {
        recovery::log_recovery(&self.board_dir, entry);
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    blob: Option<String>,
    saves: usize,
    fail_writes: bool,
    log: Vec<RecoveryEntry>,
}

/// A backend that keeps the blob in memory. Clones share state, so a test
/// can keep a handle after moving one into a repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        let backend = Self::default();
        backend.state.borrow_mut().blob = Some(blob.into());
        backend
    }

    pub fn blob(&self) -> Option<String> {
        self.state.borrow().blob.clone()
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }

    /// Make subsequent saves fail, as a full disk would
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn logged(&self) -> Vec<RecoveryEntry> {
        self.state.borrow().log.clone()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.borrow().blob.clone())
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StoreError::Write {
                location: "memory".to_string(),
                source: std::io::Error::other("writes disabled"),
            });
        }
        state.blob = Some(blob.to_string());
        state.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn log(&self, entry: RecoveryEntry) {
        self.state.borrow_mut().log.push(entry);
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// How the store came to be in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Read an existing blob as-is
    Persisted,
    /// Read an existing blob and defaulted fields on this many tasks
    Migrated(usize),
    /// No blob existed; initialized from the bundled sample data
    Seeded,
}

/// Load the store from `backend`, seeding or migrating as needed. Seeding
/// and migration both persist the result before returning.
pub fn load_store(backend: &mut dyn StoreBackend) -> Result<(StoreData, LoadSource), StoreError> {
    let Some(blob) = backend.load()? else {
        let data = seed_data()?;
        backend.save(&encode(&data)?)?;
        return Ok((data, LoadSource::Seeded));
    };

    let location = backend.location();
    let mut value: Value = serde_json::from_str(&blob).map_err(|source| StoreError::Parse {
        location: location.clone(),
        source,
    })?;
    let migrated = migrate_value(&mut value);
    let data: StoreData =
        serde_json::from_value(value).map_err(|source| StoreError::Parse { location, source })?;

    if migrated == 0 {
        return Ok((data, LoadSource::Persisted));
    }
    backend.save(&encode(&data)?)?;
    backend.log(
        RecoveryEntry::new(RecoveryCategory::Migration, "defaulted missing task fields")
            .field("Tasks", migrated.to_string()),
    );
    Ok((data, LoadSource::Migrated(migrated)))
}

/// Add `progress`, `estimate` and `budget` to task records that lack them.
/// Never removes or renames anything. Returns the number of tasks touched.
pub fn migrate_value(value: &mut Value) -> usize {
    let Some(tasks) = value.get_mut("tasks").and_then(Value::as_array_mut) else {
        return 0;
    };
    let mut touched = 0;
    for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
        let mut changed = false;
        for field in MIGRATED_TASK_FIELDS {
            if !task.contains_key(field) {
                task.insert(field.to_string(), migrated_default(field));
                changed = true;
            }
        }
        if changed {
            touched += 1;
        }
    }
    touched
}

/// The bundled sample data, narrowed to the persisted fields
pub fn seed_data() -> Result<StoreData, StoreError> {
    serde_json::from_str(SEED_JSON).map_err(|source| StoreError::Parse {
        location: "bundled sample data".to_string(),
        source,
    })
}

pub fn encode(data: &StoreData) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Estimate, TaskStatus};
    use tempfile::TempDir;

    #[test]
    fn missing_blob_seeds_and_persists() {
        let mut backend = MemoryBackend::new();
        let (data, source) = load_store(&mut backend).unwrap();
        assert_eq!(source, LoadSource::Seeded);
        assert_eq!(data.projects.len(), 3);
        assert_eq!(backend.saves(), 1);

        let persisted: StoreData = serde_json::from_str(&backend.blob().unwrap()).unwrap();
        assert_eq!(persisted, data);
    }

    #[test]
    fn seed_drops_extra_fields() {
        let mut backend = MemoryBackend::new();
        load_store(&mut backend).unwrap();
        let blob = backend.blob().unwrap();
        assert!(!blob.contains("assignee"));
        assert!(!blob.contains("owner"));
        assert!(!blob.contains("color"));
    }

    #[test]
    fn seed_counts_match_tasks() {
        let data = seed_data().unwrap();
        for project in &data.projects {
            assert_eq!(project.task_count, data.count_tasks(&project.id));
            assert_eq!(project.completed_count, data.count_done(&project.id));
        }
    }

    #[test]
    fn persisted_blob_loads_without_saving() {
        let mut backend = MemoryBackend::with_blob(
            r#"{"projects": [], "tasks": [{"id": "1", "projectId": "p", "title": "a",
                "status": "Done", "priority": "Low", "progress": 100,
                "estimate": "2h", "budget": 10}]}"#,
        );
        let (data, source) = load_store(&mut backend).unwrap();
        assert_eq!(source, LoadSource::Persisted);
        assert_eq!(data.tasks[0].status, TaskStatus::Done);
        assert_eq!(backend.saves(), 0);
    }

    #[test]
    fn day_estimates_load_and_persist_unchanged() {
        let blob = r#"{"projects": [], "tasks": [
            {"id": "1", "projectId": "p", "title": "rollout", "status": "Not Started",
             "priority": "Low", "progress": 0, "estimate": "3d", "budget": 500}
        ]}"#;
        let mut backend = MemoryBackend::with_blob(blob);
        let (data, source) = load_store(&mut backend).unwrap();
        assert_eq!(source, LoadSource::Persisted);
        assert_eq!(data.tasks[0].estimate, Some(Estimate::days(3.0)));

        let encoded: Value = serde_json::from_str(&encode(&data).unwrap()).unwrap();
        assert_eq!(encoded["tasks"][0]["estimate"], "3d");
    }

    #[test]
    fn old_blob_is_migrated_and_resaved() {
        let mut backend = MemoryBackend::with_blob(
            r#"{"projects": [], "tasks": [
                {"id": "1", "projectId": "p", "title": "old", "status": "Not Started", "priority": "Low"},
                {"id": "2", "projectId": "p", "title": "newer", "status": "Done", "priority": "Low",
                 "progress": 100, "estimate": null, "budget": null}
            ]}"#,
        );
        let (data, source) = load_store(&mut backend).unwrap();
        assert_eq!(source, LoadSource::Migrated(1));
        assert_eq!(data.tasks[0].progress, 0);
        assert_eq!(data.tasks[0].estimate, None);
        assert_eq!(backend.saves(), 1);

        let saved: Value = serde_json::from_str(&backend.blob().unwrap()).unwrap();
        assert_eq!(saved["tasks"][0]["progress"], 0);
        assert_eq!(saved["tasks"][0]["budget"], Value::Null);

        let logged = backend.logged();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].category, RecoveryCategory::Migration);
    }

    #[test]
    fn migrate_keeps_existing_values() {
        let mut value: Value = serde_json::from_str(
            r#"{"tasks": [{"id": "1", "progress": 55, "extra": true}]}"#,
        )
        .unwrap();
        assert_eq!(migrate_value(&mut value), 1);
        assert_eq!(value["tasks"][0]["progress"], 55);
        assert_eq!(value["tasks"][0]["extra"], true);
        assert_eq!(value["tasks"][0]["estimate"], Value::Null);
        assert_eq!(migrate_value(&mut value), 0);
    }

    #[test]
    fn corrupt_blob_is_a_parse_error() {
        let mut backend = MemoryBackend::with_blob("not json {{{");
        assert!(matches!(
            load_store(&mut backend),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn file_backend_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut backend = FileBackend::new(tmp.path(), "board");
        assert!(backend.load().unwrap().is_none());
        backend.save("{\"projects\": [], \"tasks\": []}").unwrap();
        assert_eq!(backend.path(), tmp.path().join("board.json"));
        let (data, source) = load_store(&mut backend).unwrap();
        assert_eq!(source, LoadSource::Persisted);
        assert_eq!(data, StoreData::default());
    }

    #[test]
    fn file_backend_write_failure_is_logged() {
        let tmp = TempDir::new().unwrap();
        let board_dir = tmp.path().to_path_buf();
        let mut backend = FileBackend::new(&board_dir, "board");
        // A directory where the blob should be makes the rename fail
        fs::create_dir_all(backend.path()).unwrap();
        assert!(matches!(
            backend.save("{}"),
            Err(StoreError::Write { .. })
        ));
        let entries = recovery::read_recovery_entries(&board_dir, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Write);
        assert_eq!(entries[0].body, "{}");
    }
}
