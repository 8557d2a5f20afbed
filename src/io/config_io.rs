use std::fs;
use std::path::Path;

use crate::io::board_io::{BoardError, CONFIG_FILE};
use crate::model::config::BoardConfig;

const CONFIG_TEMPLATE: &str = r##"[board]
name = {name}

[store]
# The store is kept in <key>.json next to this file.
key = "taskboard"

# --- Input limits ---
# Applied by `tb add` and `tb edit` before validation. Defaults shown.
#
# [limits]
# title_max = 100
# description_max = 500
# estimate_digits = 8
# budget_digits = 10
"##;

/// Read and parse `taskboard.toml` from the board directory.
pub fn read_config(board_dir: &Path) -> Result<BoardConfig, BoardError> {
    let config_path = board_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| BoardError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&config_text)?)
}

/// The commented config written by `tb init`
pub fn render_config(name: &str) -> String {
    // toml::Value's Display quotes and escapes the string
    let quoted = toml::Value::String(name.to_string()).to_string();
    CONFIG_TEMPLATE.replace("{name}", &quoted)
}

/// Write a fresh config, replacing any existing one.
pub fn write_config(board_dir: &Path, name: &str) -> Result<(), BoardError> {
    let config_path = board_dir.join(CONFIG_FILE);
    fs::write(&config_path, render_config(name)).map_err(|e| BoardError::WriteError {
        path: config_path,
        source: e,
    })
}
