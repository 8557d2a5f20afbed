//! Append-only recovery log.
//!
//! Anything the board could not save normally (a failed blob write) or
//! dropped on purpose (a cascading delete, a migration) is appended here as
//! a markdown entry so it can be recovered by hand.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

const LOG_FILE: &str = ".recovery.log";

const FILE_HEADER: &str = "\
<!-- taskboard recovery log: data that could not be saved, or was removed.
     View with: tb recovery
     Safe to delete once you no longer need anything in it. -->

---
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryCategory {
    /// A store write failed; the body holds the unsaved blob
    Write,
    /// Tasks removed by a cascading delete; the body holds their records
    Delete,
    /// Fields defaulted while loading an older blob
    Migration,
}

impl RecoveryCategory {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "write" => Some(RecoveryCategory::Write),
            "delete" => Some(RecoveryCategory::Delete),
            "migration" => Some(RecoveryCategory::Migration),
            _ => None,
        }
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Delete => write!(f, "delete"),
            RecoveryCategory::Migration => write!(f, "migration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} [{}] {}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```json\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }
}

pub fn recovery_log_path(board_dir: &Path) -> PathBuf {
    board_dir.join(LOG_FILE)
}

/// Write `content` to `path` via a sibling temp file and rename, so readers
/// never observe a half-written file.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Append an entry. Failures are reported on stderr and otherwise ignored.
pub fn log_recovery(board_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(board_dir, &entry) {
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn append_entry(board_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(board_dir);
    let fresh = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if fresh {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Read entries, most recent first, keeping at most `limit`.
pub fn read_recovery_entries(board_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(content) = std::fs::read_to_string(recovery_log_path(board_dir)) else {
        return Vec::new();
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RecoveryEntry> = None;
    let mut in_body = false;

    for line in content.lines() {
        if in_body {
            if line == "```" {
                in_body = false;
            } else if let Some(entry) = current.as_mut() {
                if !entry.body.is_empty() {
                    entry.body.push('\n');
                }
                entry.body.push_str(line);
            }
            continue;
        }
        if let Some(header) = line.strip_prefix("## ") {
            entries.extend(current.take());
            current = parse_header(header);
        } else if line == "---" {
            entries.extend(current.take());
        } else if line.starts_with("```") {
            in_body = current.is_some();
        } else if let Some(entry) = current.as_mut()
            && let Some((key, value)) = line.split_once(": ")
        {
            entry.fields.push((key.to_string(), value.to_string()));
        }
    }
    entries.extend(current);
    entries
}

/// `<rfc3339> [<category>] <description>`
fn parse_header(header: &str) -> Option<RecoveryEntry> {
    let (stamp, rest) = header.split_once(' ')?;
    let rest = rest.strip_prefix('[')?;
    let (category, description) = rest.split_once("] ")?;
    Some(RecoveryEntry {
        timestamp: DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc),
        category: RecoveryCategory::parse(category)?,
        description: description.to_string(),
        fields: Vec::new(),
        body: String::new(),
    })
}
