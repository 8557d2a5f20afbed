use std::fs;
use std::path::{Path, PathBuf};

use crate::io::config_io;
use crate::io::store_io::FileBackend;
use crate::model::config::BoardConfig;

/// Name of the directory that marks a board
pub const BOARD_DIR: &str = "taskboard";
pub const CONFIG_FILE: &str = "taskboard.toml";

/// Error type for locating and reading a board
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("not a taskboard: no taskboard/ directory found")]
    NotABoard,
    #[error("a board already exists in {0} (use --force to reinitialize)")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse taskboard.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
}

/// A located board: the directory containing `taskboard/` and its config
#[derive(Debug, Clone)]
pub struct Board {
    pub root: PathBuf,
    pub board_dir: PathBuf,
    pub config: BoardConfig,
}

impl Board {
    /// The file backend for this board's store
    pub fn backend(&self) -> FileBackend {
        FileBackend::new(&self.board_dir, &self.config.store.key)
    }
}

/// Walk up from `start` looking for a `taskboard/` directory with a config.
pub fn discover_board(start: &Path) -> Result<PathBuf, BoardError> {
    let mut current = start.to_path_buf();
    loop {
        let board_dir = current.join(BOARD_DIR);
        if board_dir.is_dir() && board_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(BoardError::NotABoard);
        }
    }
}

/// Load the board rooted at `root`.
pub fn load_board(root: &Path) -> Result<Board, BoardError> {
    let board_dir = root.join(BOARD_DIR);
    if !board_dir.is_dir() {
        return Err(BoardError::NotABoard);
    }
    let config = config_io::read_config(&board_dir)?;
    Ok(Board {
        root: root.to_path_buf(),
        board_dir,
        config,
    })
}

/// Create `taskboard/` and its config under `root`. The store itself is
/// left to the caller. With `force`, an existing config is overwritten.
pub fn init_board(root: &Path, name: &str, force: bool) -> Result<Board, BoardError> {
    let board_dir = root.join(BOARD_DIR);
    if board_dir.join(CONFIG_FILE).exists() && !force {
        return Err(BoardError::AlreadyExists(board_dir));
    }
    fs::create_dir_all(&board_dir).map_err(|e| BoardError::WriteError {
        path: board_dir.clone(),
        source: e,
    })?;
    config_io::write_config(&board_dir, name)?;
    load_board(root)
}

/// Infer a board name from a directory name: hyphens become spaces, words title-cased.
pub fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
